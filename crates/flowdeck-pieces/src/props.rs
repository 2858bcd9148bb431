//! Input property schemas ("props").
//!
//! Every action declares an ordered map of named properties. The order is
//! part of the schema (it drives form rendering upstream), so the map is
//! an [`IndexMap`] rather than a hash map.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered mapping from field name to its property descriptor.
pub type InputPropertyMap = IndexMap<String, PieceProperty>;

/// The type and validation behavior of a single input property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyType {
    /// Single-line text.
    ShortText,
    /// Multi-line text.
    LongText,
    /// Text that must never be echoed back in logs.
    SecretText,
    /// Numeric value; numeric strings are coerced.
    Number,
    /// Boolean; defaults to `false` when omitted and optional.
    Checkbox,
    /// Arbitrary JSON; JSON-encoded strings are parsed.
    Json,
    /// JSON array; JSON-encoded strings are parsed.
    Array,
    /// JSON object; JSON-encoded strings are parsed.
    Object,
    /// One value out of a fixed option list.
    StaticDropdown {
        /// The allowed values.
        options: Vec<Value>,
    },
}

/// A single declared input property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieceProperty {
    /// Human-readable name shown in forms.
    pub display_name: String,
    /// Optional help text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether a value must be present after processing.
    pub required: bool,
    /// Type and coercion behavior.
    #[serde(flatten)]
    pub property_type: PropertyType,
    /// Value substituted when the caller omits the field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

impl PieceProperty {
    /// Create a property with the given type and required-ness.
    pub fn new(display_name: impl Into<String>, property_type: PropertyType, required: bool) -> Self {
        Self {
            display_name: display_name.into(),
            description: None,
            required,
            property_type,
            default_value: None,
        }
    }

    /// Attach a default value used when the caller omits the field.
    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Attach help text.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// How a piece authenticates against its third-party service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthScheme {
    /// A single secret value (API key, token).
    SecretText,
    /// Username and password pair.
    BasicAuth,
    /// OAuth2 access token (refresh handled by the connection store).
    OAuth2,
    /// Piece-defined property bag.
    Custom {
        /// The properties making up the credential.
        props: InputPropertyMap,
    },
}

/// The authentication property a piece declares, if any.
///
/// When an action sets `require_auth`, the processed input must carry a
/// credential under the reserved key
/// [`AUTHENTICATION_PROPERTY_NAME`](flowdeck_types::AUTHENTICATION_PROPERTY_NAME).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieceAuthProperty {
    /// Human-readable name shown in connection forms.
    pub display_name: String,
    /// Optional help text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The authentication scheme.
    #[serde(flatten)]
    pub scheme: AuthScheme,
}

impl PieceAuthProperty {
    /// Create an auth property with the given scheme.
    pub fn new(display_name: impl Into<String>, scheme: AuthScheme) -> Self {
        Self {
            display_name: display_name.into(),
            description: None,
            scheme,
        }
    }
}
