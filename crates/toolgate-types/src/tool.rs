//! Tool catalogue types

use serde::{Deserialize, Serialize};

use crate::ToolNameError;

/// Maximum length of a tool name
pub const MAX_TOOL_NAME_LEN: usize = 64;

/// Tools offered by the product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tool {
    /// Source code formatter
    CodeFormatter,
    /// CSV <-> Excel converter
    CsvExcelConverter,
    /// QR code generator
    QrCodeGenerator,
    /// Barcode generator
    BarcodeGenerator,
    /// DNS / ping / port lookups
    NetworkTools,
    /// Regular expression builder
    RegexBuilder,
    /// SQL dialect converter
    SqlConverter,
    /// Unit converter
    UnitConverter,
    /// Image to text
    Ocr,
    /// Password generator
    PasswordGenerator,
    /// Random number generator
    RandomGenerator,
    /// Image format conversion and generation
    ImageTools,
    /// HTTP API client
    ApiClient,
}

impl Tool {
    /// Every tool in the catalogue
    pub const ALL: [Tool; 13] = [
        Self::CodeFormatter,
        Self::CsvExcelConverter,
        Self::QrCodeGenerator,
        Self::BarcodeGenerator,
        Self::NetworkTools,
        Self::RegexBuilder,
        Self::SqlConverter,
        Self::UnitConverter,
        Self::Ocr,
        Self::PasswordGenerator,
        Self::RandomGenerator,
        Self::ImageTools,
        Self::ApiClient,
    ];

    /// Get the tool slug
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CodeFormatter => "code-formatter",
            Self::CsvExcelConverter => "csv-excel-converter",
            Self::QrCodeGenerator => "qr-code-generator",
            Self::BarcodeGenerator => "barcode-generator",
            Self::NetworkTools => "network-tools",
            Self::RegexBuilder => "regex-builder",
            Self::SqlConverter => "sql-converter",
            Self::UnitConverter => "unit-converter",
            Self::Ocr => "ocr",
            Self::PasswordGenerator => "password-generator",
            Self::RandomGenerator => "random-generator",
            Self::ImageTools => "image-tools",
            Self::ApiClient => "api-client",
        }
    }

    /// Look up a catalogue tool by slug
    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.as_str() == slug)
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Validated tool name.
///
/// Catalogue tools always validate; unknown but well-formed slugs are accepted
/// so new tools can be metered without a client release.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ToolName(String);

impl ToolName {
    /// Validate and wrap a tool name
    pub fn parse(name: impl Into<String>) -> Result<Self, ToolNameError> {
        let name = name.into();
        validate_tool_name(&name)?;
        Ok(Self(name))
    }

    /// Borrow the tool name
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The catalogue entry for this name, if it is a known tool
    pub fn tool(&self) -> Option<Tool> {
        Tool::from_slug(&self.0)
    }
}

fn validate_tool_name(name: &str) -> Result<(), ToolNameError> {
    if name.is_empty() {
        return Err(ToolNameError::Empty);
    }
    if name.len() > MAX_TOOL_NAME_LEN {
        return Err(ToolNameError::TooLong {
            len: name.len(),
            max: MAX_TOOL_NAME_LEN,
        });
    }
    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(ToolNameError::InvalidStart(name.to_string()));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ToolNameError::InvalidCharacters(name.to_string()));
    }
    Ok(())
}

impl From<Tool> for ToolName {
    fn from(tool: Tool) -> Self {
        Self(tool.as_str().to_string())
    }
}

impl TryFrom<String> for ToolName {
    type Error = ToolNameError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<ToolName> for String {
    fn from(name: ToolName) -> Self {
        name.0
    }
}

impl std::str::FromStr for ToolName {
    type Err = ToolNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
