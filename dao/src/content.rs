//! Proposal content
//!
//! Content is a closed sum over the proposal kinds this chain understands.
//! On the wire it travels as a codec envelope, so the registered names
//! (`dao/TextProposal`, `dao/SoftwareUpgradeProposal`) are part of the
//! persisted format.

use crate::error::{Error, Result};
use crate::ROUTER_KEY;
use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use staking_core::codec::{Envelope, Named, Registry};
use std::fmt;
use std::sync::OnceLock;

/// Type of a text proposal
pub const PROPOSAL_TYPE_TEXT: &str = "Text";

/// Type of a software upgrade proposal
pub const PROPOSAL_TYPE_SOFTWARE_UPGRADE: &str = "SoftwareUpgrade";

/// Behaviour shared by every proposal kind
pub trait ProposalContent {
    /// Proposal title
    fn title(&self) -> &str;
    /// Proposal description
    fn description(&self) -> &str;
    /// Route of the handler that executes the proposal
    fn proposal_route(&self) -> &'static str;
    /// Proposal type tag
    fn proposal_type(&self) -> &'static str;
    /// Stateless validation
    fn validate_basic(&self) -> Result<()>;
}

/// Governance content limits
///
/// Every check is off by default; operators opt in through configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentLimits {
    /// Maximum title length in characters
    pub max_title_length: Option<usize>,
    /// Maximum description length in characters
    pub max_description_length: Option<usize>,
    /// Reject blank titles and descriptions
    pub reject_blank: bool,
}

/// Title and description checks driven by `limits`
pub fn validate_abstract(limits: &ContentLimits, content: &dyn ProposalContent) -> Result<()> {
    let title = content.title();
    let description = content.description();

    if limits.reject_blank {
        if title.trim().is_empty() {
            return Err(Error::InvalidContent("proposal title cannot be blank".into()));
        }
        if description.trim().is_empty() {
            return Err(Error::InvalidContent(
                "proposal description cannot be blank".into(),
            ));
        }
    }
    if let Some(max) = limits.max_title_length {
        if title.chars().count() > max {
            return Err(Error::InvalidContent(format!(
                "proposal title is longer than max length of {}",
                max
            )));
        }
    }
    if let Some(max) = limits.max_description_length {
        if description.chars().count() > max {
            return Err(Error::InvalidContent(format!(
                "proposal description is longer than max length of {}",
                max
            )));
        }
    }
    Ok(())
}

/// Signalling proposal with no on-chain effect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextProposal {
    /// Title
    pub title: String,
    /// Description
    pub description: String,
}

impl TextProposal {
    /// Create a text proposal
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

impl Named for TextProposal {
    const TYPE_NAME: &'static str = "dao/TextProposal";
}

impl ProposalContent for TextProposal {
    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn proposal_route(&self) -> &'static str {
        ROUTER_KEY
    }

    fn proposal_type(&self) -> &'static str {
        PROPOSAL_TYPE_TEXT
    }

    fn validate_basic(&self) -> Result<()> {
        validate_abstract(&ContentLimits::default(), self)
    }
}

impl fmt::Display for TextProposal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Text Proposal:\n  Title:       {}\n  Description: {}\n",
            self.title, self.description
        )
    }
}

/// Upgrade scheduled by a software upgrade proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradePlan {
    /// Upgrade name, used by node operators to pick the new binary
    pub name: String,
    /// Height at which the chain halts for the upgrade
    pub height: u64,
    /// Free-form details
    #[serde(default)]
    pub info: String,
}

/// Proposal to schedule a software upgrade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftwareUpgradeProposal {
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// Upgrade plan
    pub plan: UpgradePlan,
}

impl SoftwareUpgradeProposal {
    /// Create a software upgrade proposal
    pub fn new(title: impl Into<String>, description: impl Into<String>, plan: UpgradePlan) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            plan,
        }
    }
}

impl Named for SoftwareUpgradeProposal {
    const TYPE_NAME: &'static str = "dao/SoftwareUpgradeProposal";
}

impl ProposalContent for SoftwareUpgradeProposal {
    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn proposal_route(&self) -> &'static str {
        ROUTER_KEY
    }

    fn proposal_type(&self) -> &'static str {
        PROPOSAL_TYPE_SOFTWARE_UPGRADE
    }

    fn validate_basic(&self) -> Result<()> {
        validate_abstract(&ContentLimits::default(), self)?;
        if self.plan.name.trim().is_empty() {
            return Err(Error::InvalidContent("upgrade plan name cannot be blank".into()));
        }
        if self.plan.height == 0 {
            return Err(Error::InvalidContent("upgrade plan height must be positive".into()));
        }
        Ok(())
    }
}

impl fmt::Display for SoftwareUpgradeProposal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Software Upgrade Proposal:\n  Title:       {}\n  Description: {}\n  Upgrade:     {} at height {}\n",
            self.title, self.description, self.plan.name, self.plan.height
        )
    }
}

/// Proposal content, one variant per registered kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Text proposal
    Text(TextProposal),
    /// Software upgrade proposal
    SoftwareUpgrade(SoftwareUpgradeProposal),
}

impl Content {
    fn inner(&self) -> &dyn ProposalContent {
        match self {
            Content::Text(p) => p,
            Content::SoftwareUpgrade(p) => p,
        }
    }

    /// Registered codec name of the variant
    pub fn type_name(&self) -> &'static str {
        match self {
            Content::Text(_) => TextProposal::TYPE_NAME,
            Content::SoftwareUpgrade(_) => SoftwareUpgradeProposal::TYPE_NAME,
        }
    }

    /// Wire envelope
    pub fn to_envelope(&self) -> Result<Envelope> {
        let envelope = match self {
            Content::Text(p) => Envelope::wrap(p)?,
            Content::SoftwareUpgrade(p) => Envelope::wrap(p)?,
        };
        Ok(envelope)
    }

    /// Decode from a wire envelope through [`content_registry`]
    pub fn from_envelope(envelope: Envelope) -> Result<Self> {
        content_registry()?
            .decode(envelope)
            .map_err(|e| match e {
                staking_core::Error::UnknownMsgType(name) => Error::InvalidProposalType(name),
                other => Error::from(other),
            })
    }
}

impl ProposalContent for Content {
    fn title(&self) -> &str {
        self.inner().title()
    }

    fn description(&self) -> &str {
        self.inner().description()
    }

    fn proposal_route(&self) -> &'static str {
        self.inner().proposal_route()
    }

    fn proposal_type(&self) -> &'static str {
        self.inner().proposal_type()
    }

    fn validate_basic(&self) -> Result<()> {
        self.inner().validate_basic()
    }
}

impl fmt::Display for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Content::Text(p) => fmt::Display::fmt(p, f),
            Content::SoftwareUpgrade(p) => fmt::Display::fmt(p, f),
        }
    }
}

impl From<TextProposal> for Content {
    fn from(p: TextProposal) -> Self {
        Content::Text(p)
    }
}

impl From<SoftwareUpgradeProposal> for Content {
    fn from(p: SoftwareUpgradeProposal) -> Self {
        Content::SoftwareUpgrade(p)
    }
}

impl Serialize for Content {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_envelope()
            .map_err(S::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Content {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let envelope = Envelope::deserialize(deserializer)?;
        Content::from_envelope(envelope).map_err(D::Error::custom)
    }
}

static CONTENT_REGISTRY: OnceLock<Registry<Content>> = OnceLock::new();

/// Registry of every proposal content kind, the only content decoder
pub fn content_registry() -> Result<&'static Registry<Content>> {
    if let Some(registry) = CONTENT_REGISTRY.get() {
        return Ok(registry);
    }
    let mut registry = Registry::new();
    registry.register_named::<TextProposal>()?;
    registry.register_named::<SoftwareUpgradeProposal>()?;
    Ok(CONTENT_REGISTRY.get_or_init(|| registry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn upgrade() -> SoftwareUpgradeProposal {
        SoftwareUpgradeProposal::new(
            "v2",
            "switch to v2",
            UpgradePlan {
                name: "v2".into(),
                height: 1_000,
                info: String::new(),
            },
        )
    }

    #[test]
    fn test_routes_and_types() {
        let text = Content::from(TextProposal::new("title", "body"));
        assert_eq!(text.proposal_route(), "dao");
        assert_eq!(text.proposal_type(), "Text");

        let upgrade = Content::from(upgrade());
        assert_eq!(upgrade.proposal_route(), "dao");
        assert_eq!(upgrade.proposal_type(), "SoftwareUpgrade");
    }

    #[test]
    fn test_text_display() {
        let text = TextProposal::new("Hello", "World");
        assert_eq!(
            text.to_string(),
            "Text Proposal:\n  Title:       Hello\n  Description: World\n"
        );
    }

    #[test]
    fn test_limits_are_opt_in() {
        let blank = TextProposal::new("", "");
        assert!(blank.validate_basic().is_ok());

        let limits = ContentLimits {
            max_title_length: Some(5),
            max_description_length: Some(10),
            reject_blank: true,
        };
        assert!(matches!(
            validate_abstract(&limits, &blank),
            Err(Error::InvalidContent(_))
        ));
        assert!(validate_abstract(&limits, &TextProposal::new("short", "fine")).is_ok());
        let err = validate_abstract(&limits, &TextProposal::new("too long", "fine")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid proposal content: proposal title is longer than max length of 5"
        );
        assert!(validate_abstract(&limits, &TextProposal::new("t", "a description")).is_err());
    }

    #[test]
    fn test_upgrade_plan_validation() {
        let mut proposal = upgrade();
        assert!(proposal.validate_basic().is_ok());
        proposal.plan.height = 0;
        assert!(matches!(proposal.validate_basic(), Err(Error::InvalidContent(_))));
    }

    #[test]
    fn test_wire_form() {
        let content = Content::from(TextProposal::new("t", "d"));
        let value = serde_json::to_value(&content).unwrap();
        assert_eq!(
            value,
            json!({"type": "dao/TextProposal", "value": {"title": "t", "description": "d"}})
        );
        let decoded: Content = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, content);

        let unknown = json!({"type": "dao/Treasury", "value": {}});
        assert!(serde_json::from_value::<Content>(unknown).is_err());
    }

    #[test]
    fn test_envelope_decoding_follows_registry() {
        let registry = content_registry().unwrap();
        for name in registry.names() {
            let value = match name {
                TextProposal::TYPE_NAME => json!({"title": "t", "description": "d"}),
                _ => serde_json::to_value(upgrade()).unwrap(),
            };
            let content = Content::from_envelope(Envelope {
                type_name: name.to_string(),
                value,
            })
            .unwrap();
            assert_eq!(content.type_name(), name);
        }

        let err = Content::from_envelope(Envelope {
            type_name: "dao/Treasury".into(),
            value: json!({}),
        })
        .unwrap_err();
        assert!(matches!(err, Error::InvalidProposalType(name) if name == "dao/Treasury"));

        let err = Content::from_envelope(Envelope {
            type_name: TextProposal::TYPE_NAME.into(),
            value: json!({"title": 1}),
        })
        .unwrap_err();
        assert!(matches!(err, Error::Staking(staking_core::Error::Json(_))));
    }

    #[test]
    fn test_registry() {
        let registry = content_registry().unwrap();
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["dao/SoftwareUpgradeProposal", "dao/TextProposal"]
        );
        let decoded = registry
            .decode_json(br#"{"type":"dao/TextProposal","value":{"title":"a","description":"b"}}"#)
            .unwrap();
        assert_eq!(decoded, Content::from(TextProposal::new("a", "b")));
    }
}
