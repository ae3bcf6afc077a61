use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::ConverterConfig;
use crate::logic::office::{PresentationConverter, WordConverter};
use crate::logic::text_pdf::TextConverter;

/// Why a single conversion attempt failed.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("{0} not installed")]
    MissingDependency(String),
    #[error("{tool} conversion failed (exit code {status:?}): {stderr}")]
    ToolFailed {
        tool: String,
        status: Option<i32>,
        stderr: String,
    },
    #[error("Conversion timeout after {0:?}")]
    Timeout(Duration),
    #[error("Converter produced no output at {0}")]
    MissingOutput(PathBuf),
    #[error("PDF rendering failed: {0}")]
    Render(String),
    #[error("Conversion I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One strategy that turns a file of a given format into a PDF.
#[async_trait::async_trait]
pub trait FormatConverter: Send + Sync {
    /// Short label used in log lines and success messages
    fn name(&self) -> &'static str;

    /// Writes a PDF rendition of `input` to `output` and returns a success
    /// message.
    async fn convert(&self, input: &Path, output: &Path) -> Result<String, ConversionError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConverterKind {
    Word,
    Text,
    Presentation,
}

impl ConverterKind {
    /// Extension matching is case-insensitive and expects the leading dot.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_lowercase().as_str() {
            ".doc" | ".docx" => Some(ConverterKind::Word),
            ".txt" => Some(ConverterKind::Text),
            ".ppt" | ".pptx" => Some(ConverterKind::Presentation),
            _ => None,
        }
    }
}

/// Uniform result of [`DocumentConverter::convert_to_pdf`]; callers branch on
/// `success` and never see an error type.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionOutcome {
    pub success: bool,
    pub output_path: Option<PathBuf>,
    pub message: String,
}

impl ConversionOutcome {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            output_path: None,
            message: message.into(),
        }
    }
}

/// Picks the converter strategy for a file by its extension.
#[derive(Clone)]
pub struct DocumentConverter {
    word: Arc<dyn FormatConverter>,
    text: Arc<dyn FormatConverter>,
    presentation: Arc<dyn FormatConverter>,
}

impl DocumentConverter {
    pub fn new(config: &ConverterConfig) -> Self {
        Self {
            word: Arc::new(WordConverter::new(
                config.docx2pdf_command.clone(),
                config.timeout(),
            )),
            text: Arc::new(TextConverter),
            presentation: Arc::new(PresentationConverter::new(
                config.resolve_soffice(),
                config.timeout(),
            )),
        }
    }

    pub fn with_converters(
        word: Arc<dyn FormatConverter>,
        text: Arc<dyn FormatConverter>,
        presentation: Arc<dyn FormatConverter>,
    ) -> Self {
        Self {
            word,
            text,
            presentation,
        }
    }

    pub fn is_supported(extension: &str) -> bool {
        ConverterKind::from_extension(extension).is_some()
    }

    /// Converts `input` to PDF. When `output` is `None` the PDF is written
    /// next to the input with its extension replaced by `.pdf`.
    pub async fn convert_to_pdf(&self, input: &Path, output: Option<&Path>) -> ConversionOutcome {
        let extension = dotted_extension(input);
        let Some(kind) = ConverterKind::from_extension(&extension) else {
            return ConversionOutcome::failed(format!("Unsupported format: {}", extension));
        };

        let output = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| input.with_extension("pdf"));

        let converter = match kind {
            ConverterKind::Word => &self.word,
            ConverterKind::Text => &self.text,
            ConverterKind::Presentation => &self.presentation,
        };

        match converter.convert(input, &output).await {
            Ok(message) => {
                log::info!(
                    "Converted {} to {} with {}",
                    input.display(),
                    output.display(),
                    converter.name()
                );
                ConversionOutcome {
                    success: true,
                    output_path: Some(output),
                    message,
                }
            }
            Err(e) => {
                match &e {
                    ConversionError::MissingDependency(_) => {
                        log::warn!("Cannot convert {}: {}", input.display(), e)
                    }
                    _ => log::error!("Failed to convert {}: {}", input.display(), e),
                }
                ConversionOutcome::failed(e.to_string())
            }
        }
    }
}

/// Lower-cased extension of `path` including the leading dot, or an empty
/// string when there is none.
pub fn dotted_extension(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// `report.DOCX` -> `report.pdf`, `notes` -> `notes.pdf`
pub fn get_converted_filename(original_filename: &str) -> String {
    let converted = Path::new(original_filename).with_extension("pdf");
    converted
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("{}.pdf", original_filename))
}
