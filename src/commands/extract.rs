use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::cli::{ExtractArgs, OutputFormat};
use crate::model::{FieldShape, FormSchemaManifest};
use crate::schema::SchemaExtractor;
use crate::session::FormSession;
use crate::util::{now_utc_string, read_source, sha256_hex, write_json_pretty};

const MANIFEST_VERSION: u32 = 1;

pub fn run(args: ExtractArgs) -> Result<()> {
    info!(
        input = %args.input.display(),
        format = args.format.as_str(),
        "extracting form schema"
    );

    let raw = read_source(&args.input)?;
    let manifest = build_manifest(&args.input, &raw)?;

    if manifest.fields.is_empty() {
        warn!(source = %manifest.source, "no form fields found");
    }

    if let Some(output) = &args.output {
        write_json_pretty(output, &manifest)?;
        info!(path = %output.display(), "wrote form schema manifest");
    }

    match args.format {
        OutputFormat::Json => {
            let data = serde_json::to_string_pretty(&manifest)
                .context("failed to serialize form schema manifest")?;
            println!("{data}");
        }
        OutputFormat::Summary => log_summary(&manifest),
    }

    Ok(())
}

/// Extracts `raw` through a fresh session; a failed load aborts with its message.
pub fn load_session(raw: &str) -> Result<FormSession> {
    let extractor = SchemaExtractor::new().context("failed to build schema extractor")?;
    let mut session = FormSession::new();
    session.load(&extractor, raw);

    if let Some(message) = session.error_message() {
        bail!("failed to extract form fields: {message}");
    }
    Ok(session)
}

pub fn build_manifest(source: &Path, raw: &str) -> Result<FormSchemaManifest> {
    let session = load_session(raw)?;
    let fields = session.fields().to_vec();
    let initial_values = session.values().cloned().unwrap_or_default();

    Ok(FormSchemaManifest {
        manifest_version: MANIFEST_VERSION,
        generated_at: now_utc_string(),
        source: source.display().to_string(),
        source_sha256: sha256_hex(raw.as_bytes()),
        field_count: fields.len(),
        fields,
        initial_values,
    })
}

fn log_summary(manifest: &FormSchemaManifest) {
    for (index, field) in manifest.fields.iter().enumerate() {
        match &field.shape {
            FieldShape::Text { length } => info!(
                index,
                name = %field.name,
                kind = %field.kind(),
                label = %field.label,
                length,
                "field"
            ),
            FieldShape::Choice { options } => {
                let options = options
                    .iter()
                    .map(|option| format!("{}={}", option.token, option.display))
                    .collect::<Vec<_>>()
                    .join(", ");
                info!(
                    index,
                    name = %field.name,
                    kind = %field.kind(),
                    label = %field.label,
                    options = %options,
                    "field"
                );
            }
            FieldShape::Date | FieldShape::Signature => info!(
                index,
                name = %field.name,
                kind = %field.kind(),
                label = %field.label,
                "field"
            ),
        }
    }

    info!(
        source = %manifest.source,
        sha256 = %manifest.source_sha256,
        field_count = manifest.field_count,
        "extraction completed"
    );
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::model::{FieldKind, FieldValue};

    const SAMPLE_FORM: &str = include_str!("../../fixtures/sample_form.xml");

    #[test]
    fn build_manifest_carries_fields_and_initial_values() {
        let manifest = build_manifest(&PathBuf::from("fixtures/sample_form.xml"), SAMPLE_FORM)
            .expect("sample manifest should build");

        assert_eq!(manifest.manifest_version, 1);
        assert_eq!(manifest.field_count, 5);
        assert_eq!(manifest.source, "fixtures/sample_form.xml");
        assert_eq!(manifest.source_sha256, sha256_hex(SAMPLE_FORM.as_bytes()));

        let kinds: Vec<_> = manifest.fields.iter().map(|field| field.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                FieldKind::Text,
                FieldKind::Date,
                FieldKind::Choice,
                FieldKind::Text,
                FieldKind::Signature,
            ]
        );

        assert_eq!(
            manifest.initial_values.get("MARITAL"),
            Some(&FieldValue::Choice("S".to_string()))
        );
        assert_eq!(
            manifest.initial_values.get("SURNAME"),
            Some(&FieldValue::Text(String::new()))
        );
        assert!(matches!(
            manifest.initial_values.get("DOB"),
            Some(FieldValue::Date(_))
        ));
    }

    #[test]
    fn load_session_reports_structure_failures() {
        let err = load_session("<div><div class=\"formSide\" id=\"formSide9\"/></div>")
            .expect_err("missing anchor should fail");
        let message = err.to_string();
        assert!(message.contains("unexpected form structure"), "{message}");
    }

    #[test]
    fn manifest_serializes_fields_with_kind_tags() {
        let manifest = build_manifest(&PathBuf::from("-"), SAMPLE_FORM)
            .expect("sample manifest should build");
        let value = serde_json::to_value(&manifest).expect("manifest should serialize");

        assert_eq!(value["fields"][0]["kind"], "text");
        assert_eq!(value["fields"][0]["length"], 6);
        assert_eq!(value["fields"][2]["options"][1]["display"], "Married (M)");
        assert_eq!(value["initial_values"]["APPLICANT_SIGNATURE"], serde_json::json!([]));
    }
}
