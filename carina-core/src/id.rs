//! Resource identity - Structured identifiers for remote resources
//!
//! A `ResourceId` addresses exactly one remote resource instance through its
//! subscription, resource group, provider namespace and one or more typed
//! name segments:
//!
//! ```text
//! /subscriptions/{sub}/resourceGroups/{rg}/providers/{ns}/{type}/{name}[/{type}/{name}...]
//! ```

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const SUBSCRIPTIONS: &str = "subscriptions";
const RESOURCE_GROUPS: &str = "resourceGroups";
const PROVIDERS: &str = "providers";

/// Errors raised while parsing a resource ID string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdParseError {
    #[error("ID was empty")]
    Empty,

    #[error("parsing {input:?}: expected the segment {expected:?} but got {found:?}")]
    UnexpectedSegment {
        input: String,
        expected: String,
        found: String,
    },

    #[error("parsing {input:?}: the segment {segment:?} is missing its value")]
    MissingValue { input: String, segment: String },

    #[error("parsing {input:?}: expected a {description} ID")]
    WrongShape { input: String, description: String },
}

/// One `{type}/{name}` pair below the provider namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdSegment {
    pub resource_type: String,
    pub name: String,
}

/// Unique identifier of a remote resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    pub subscription_id: String,
    pub resource_group: String,
    /// Provider namespace (e.g., "Microsoft.Relay")
    pub provider: String,
    /// Typed name segments, outermost first. Never empty.
    pub segments: Vec<IdSegment>,
}

impl ResourceId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        provider: impl Into<String>,
        resource_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            provider: provider.into(),
            segments: vec![IdSegment {
                resource_type: resource_type.into(),
                name: name.into(),
            }],
        }
    }

    /// Address a child resource below this one
    pub fn child(&self, resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        let mut id = self.clone();
        id.segments.push(IdSegment {
            resource_type: resource_type.into(),
            name: name.into(),
        });
        id
    }

    /// Name of the innermost resource
    pub fn name(&self) -> &str {
        self.segments
            .last()
            .map(|s| s.name.as_str())
            .unwrap_or_default()
    }

    /// Canonical string form
    pub fn id(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/{}/{}/{}/{}/{}/{}",
            SUBSCRIPTIONS,
            self.subscription_id,
            RESOURCE_GROUPS,
            self.resource_group,
            PROVIDERS,
            self.provider
        )?;
        for segment in &self.segments {
            write!(f, "/{}/{}", segment.resource_type, segment.name)?;
        }
        Ok(())
    }
}

impl FromStr for ResourceId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_components(s, false)
    }
}

/// Expected shape of a resource ID for one resource type
///
/// `types` lists the segment types from the outermost resource inwards,
/// e.g. `["namespaces", "authorizationRules"]`.
#[derive(Debug, Clone, Copy)]
pub struct ResourceIdFormat {
    pub provider: &'static str,
    pub types: &'static [&'static str],
    pub description: &'static str,
}

impl ResourceIdFormat {
    pub const fn new(
        provider: &'static str,
        types: &'static [&'static str],
        description: &'static str,
    ) -> Self {
        Self {
            provider,
            types,
            description,
        }
    }

    /// Build an ID of this shape; `names` pairs up with `types`
    pub fn build(&self, subscription_id: &str, resource_group: &str, names: &[&str]) -> ResourceId {
        ResourceId {
            subscription_id: subscription_id.to_string(),
            resource_group: resource_group.to_string(),
            provider: self.provider.to_string(),
            segments: self
                .types
                .iter()
                .zip(names)
                .map(|(t, n)| IdSegment {
                    resource_type: t.to_string(),
                    name: n.to_string(),
                })
                .collect(),
        }
    }

    /// Parse an ID that must match this shape exactly
    pub fn parse(&self, input: &str) -> Result<ResourceId, IdParseError> {
        let id = parse_components(input, false)?;
        self.check(input, id, false)
    }

    /// Parse an ID whose static segments may differ in casing
    ///
    /// The returned ID carries the canonical casing of this format.
    pub fn parse_insensitively(&self, input: &str) -> Result<ResourceId, IdParseError> {
        let id = parse_components(input, true)?;
        self.check(input, id, true)
    }

    fn check(
        &self,
        input: &str,
        mut id: ResourceId,
        insensitive: bool,
    ) -> Result<ResourceId, IdParseError> {
        let same = |expected: &str, found: &str| {
            if insensitive {
                expected.eq_ignore_ascii_case(found)
            } else {
                expected == found
            }
        };

        if id.segments.len() != self.types.len() || !same(self.provider, &id.provider) {
            return Err(IdParseError::WrongShape {
                input: input.to_string(),
                description: self.description.to_string(),
            });
        }

        for (segment, expected) in id.segments.iter_mut().zip(self.types) {
            if !same(expected, &segment.resource_type) {
                return Err(IdParseError::UnexpectedSegment {
                    input: input.to_string(),
                    expected: expected.to_string(),
                    found: segment.resource_type.clone(),
                });
            }
            segment.resource_type = expected.to_string();
        }
        id.provider = self.provider.to_string();

        Ok(id)
    }
}

fn parse_components(input: &str, insensitive: bool) -> Result<ResourceId, IdParseError> {
    let trimmed = input.trim_matches('/');
    if trimmed.is_empty() {
        return Err(IdParseError::Empty);
    }

    let parts: Vec<&str> = trimmed.split('/').collect();
    let mut cursor = 0;

    let mut keyword = |expected: &str| -> Result<String, IdParseError> {
        let found = parts.get(cursor).copied().unwrap_or_default();
        let same = if insensitive {
            found.eq_ignore_ascii_case(expected)
        } else {
            found == expected
        };
        if !same {
            return Err(IdParseError::UnexpectedSegment {
                input: input.to_string(),
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }
        let value = parts.get(cursor + 1).copied().unwrap_or_default();
        if value.is_empty() {
            return Err(IdParseError::MissingValue {
                input: input.to_string(),
                segment: expected.to_string(),
            });
        }
        cursor += 2;
        Ok(value.to_string())
    };

    let subscription_id = keyword(SUBSCRIPTIONS)?;
    let resource_group = keyword(RESOURCE_GROUPS)?;
    let provider = keyword(PROVIDERS)?;

    let rest = &parts[6..];
    if rest.is_empty() || rest.len() % 2 != 0 {
        return Err(IdParseError::WrongShape {
            input: input.to_string(),
            description: "resource".to_string(),
        });
    }

    let mut segments = Vec::with_capacity(rest.len() / 2);
    for pair in rest.chunks(2) {
        if pair[0].is_empty() || pair[1].is_empty() {
            return Err(IdParseError::MissingValue {
                input: input.to_string(),
                segment: pair[0].to_string(),
            });
        }
        segments.push(IdSegment {
            resource_type: pair[0].to_string(),
            name: pair[1].to_string(),
        });
    }

    Ok(ResourceId {
        subscription_id,
        resource_group,
        provider,
        segments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMESPACE: ResourceIdFormat =
        ResourceIdFormat::new("Microsoft.Relay", &["namespaces"], "Relay Namespace");

    const RELAY_ID: &str = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/example-rg/providers/Microsoft.Relay/namespaces/example";

    #[test]
    fn format_and_parse_agree() {
        let id = NAMESPACE.build(
            "00000000-0000-0000-0000-000000000000",
            "example-rg",
            &["example"],
        );
        assert_eq!(id.to_string(), RELAY_ID);
        assert_eq!(NAMESPACE.parse(RELAY_ID).unwrap(), id);
        assert_eq!(id.name(), "example");
    }

    #[test]
    fn child_ids_append_segments() {
        let id = NAMESPACE.parse(RELAY_ID).unwrap();
        let rule = id.child("authorizationRules", "RootManageSharedAccessKey");
        assert_eq!(
            rule.to_string(),
            format!("{RELAY_ID}/authorizationRules/RootManageSharedAccessKey")
        );
        assert_eq!(rule.name(), "RootManageSharedAccessKey");
    }

    #[test]
    fn strict_parse_rejects_other_casing() {
        let lowered = RELAY_ID.replace("resourceGroups", "resourcegroups");
        assert!(matches!(
            NAMESPACE.parse(&lowered),
            Err(IdParseError::UnexpectedSegment { .. })
        ));

        let id = NAMESPACE.parse_insensitively(&lowered).unwrap();
        assert_eq!(id.to_string(), RELAY_ID);
    }

    #[test]
    fn insensitive_parse_restores_canonical_provider() {
        let format = ResourceIdFormat::new(
            "Microsoft.Insights",
            &["components"],
            "Application Insights Component",
        );
        let id = format
            .parse_insensitively("/subscriptions/s/resourcegroups/rg/providers/microsoft.insights/components/app")
            .unwrap();
        assert_eq!(
            id.to_string(),
            "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Insights/components/app"
        );
    }

    #[test]
    fn rejects_wrong_resource_type() {
        let other = RELAY_ID.replace("namespaces", "hybridConnections");
        let err = NAMESPACE.parse(&other).unwrap_err();
        assert!(err.to_string().contains("namespaces"));
    }

    #[test]
    fn rejects_missing_values_and_shapes() {
        assert_eq!("".parse::<ResourceId>(), Err(IdParseError::Empty));
        assert!(matches!(
            "/subscriptions//resourceGroups/rg".parse::<ResourceId>(),
            Err(IdParseError::MissingValue { .. })
        ));
        assert!(matches!(
            "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Relay/namespaces"
                .parse::<ResourceId>(),
            Err(IdParseError::WrongShape { .. })
        ));
        assert!(matches!(
            NAMESPACE.parse(&format!("{RELAY_ID}/authorizationRules/rule")),
            Err(IdParseError::WrongShape { .. })
        ));
    }

    #[test]
    fn generic_parse_keeps_all_segments() {
        let id: ResourceId = format!("{RELAY_ID}/authorizationRules/rule").parse().unwrap();
        assert_eq!(id.segments.len(), 2);
        assert_eq!(id.provider, "Microsoft.Relay");
        assert_eq!(id.resource_group, "example-rg");
    }
}
