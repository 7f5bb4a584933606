use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use ledgermark_core::{LedgermarkConfig, NamesConfig, OcrConfig};
use ledgermark_extract::{
    ChainResolver, HttpNameResolver, NameResolver, NoNames, StatementBuilder, StaticNameResolver,
    TimeoutResolver,
};
use ledgermark_pdf::{LayoutIndex, LopdfTarget, PdfStatementReader, TextSource};
use ledgermark_recon::{CrossReferenceMatcher, ReconcileError, Reconciler, StatementInput};

use crate::Cli;

/// Run one reconciliation and write the annotated master. Returns the
/// number of confirmed values.
pub fn audit(cli: &Cli) -> anyhow::Result<usize> {
    let config = load_config(cli.config.as_deref())?;

    let reconciler = Reconciler::new(
        statement_reader(&config.ocr),
        StatementBuilder::new(name_resolver(&config.names)?),
        CrossReferenceMatcher::new(config.matcher.clone()),
    );

    let master_bytes = std::fs::read(&cli.master)
        .with_context(|| format!("Failed to read master {}", cli.master.display()))?;
    let layout = LayoutIndex::load(&cli.layout).map_err(ReconcileError::MasterUnreadable)?;
    let mut master =
        LopdfTarget::open(&master_bytes, layout).map_err(ReconcileError::MasterUnreadable)?;

    let inputs = read_statements(&cli.statements);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let report = runtime.block_on(reconciler.reconcile(&mut master, inputs))?;

    for skipped in &report.skipped {
        tracing::warn!("{} not reconciled: {}", skipped.name, skipped.reason);
    }

    let output = cli.output.clone().unwrap_or_else(|| default_output(&cli.master));
    std::fs::write(&output, &report.document)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    tracing::info!("Annotated master written to {}", output.display());

    Ok(report.match_count())
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<LedgermarkConfig> {
    match path {
        Some(p) => LedgermarkConfig::load(p)
            .with_context(|| format!("Failed to load config {}", p.display())),
        None => Ok(LedgermarkConfig::default()),
    }
}

/// Static table first, then the HTTP directory, all under one deadline.
pub fn name_resolver(names: &NamesConfig) -> anyhow::Result<Arc<dyn NameResolver>> {
    let timeout = Duration::from_millis(names.timeout_ms);
    let mut chain: Vec<Arc<dyn NameResolver>> = Vec::new();

    if !names.table.is_empty() {
        chain.push(Arc::new(StaticNameResolver::new(names.table.iter())));
    }
    if let Some(endpoint) = &names.endpoint {
        chain.push(Arc::new(HttpNameResolver::new(endpoint, timeout)?));
    }

    if chain.is_empty() {
        tracing::debug!("No name directory configured; tax identifiers stay raw");
        return Ok(Arc::new(NoNames));
    }
    Ok(Arc::new(TimeoutResolver::new(Arc::new(ChainResolver::new(chain)), timeout)))
}

#[cfg(feature = "tesseract")]
fn statement_reader(ocr: &OcrConfig) -> Arc<dyn TextSource> {
    use ledgermark_ocr::recognizer::tesseract_backend::TesseractRecognizer;
    Arc::new(PdfStatementReader::new(TesseractRecognizer::new(ocr.data_path.clone(), &ocr.lang)))
}

#[cfg(not(feature = "tesseract"))]
fn statement_reader(_ocr: &OcrConfig) -> Arc<dyn TextSource> {
    tracing::debug!("Built without Tesseract; scanned pages will be read as blank");
    Arc::new(PdfStatementReader::new(ledgermark_ocr::UnavailableRecognizer))
}

/// Files that can't be read are reported and left out; they never abort the run.
fn read_statements(paths: &[PathBuf]) -> Vec<StatementInput> {
    paths
        .iter()
        .filter_map(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            match std::fs::read(path) {
                Ok(bytes) => Some(StatementInput::new(name, bytes)),
                Err(e) => {
                    tracing::warn!("Skipping {}: {e}", path.display());
                    None
                }
            }
        })
        .collect()
}

pub fn default_output(master: &Path) -> PathBuf {
    let file_name = master
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "master.pdf".to_string());
    master.with_file_name(format!("Audit_{file_name}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_output_sits_next_to_master() {
        assert_eq!(
            default_output(Path::new("/data/apuracao.pdf")),
            PathBuf::from("/data/Audit_apuracao.pdf")
        );
    }

    #[test]
    fn missing_config_path_uses_defaults() {
        let c = load_config(None).unwrap();
        assert_eq!(c.matcher.min_name_len, 5);
    }

    #[test]
    fn config_file_is_loaded() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            f,
            "[matcher]\nband_margin = 4.0\n\n[names.table]\n\"12.345.678/0001-90\" = \"FUNDO ALFA\""
        )
        .unwrap();
        let c = load_config(Some(f.path())).unwrap();
        assert_eq!(c.matcher.band_margin, 4.0);

        let names = name_resolver(&c.names).unwrap();
        assert_eq!(names.resolve("12345678000190").unwrap().as_deref(), Some("FUNDO ALFA"));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "[matcher]\ncolumn_cutoff_ratio = 0.0").unwrap();
        assert!(load_config(Some(f.path())).is_err());
    }

    #[test]
    fn unreadable_statement_files_are_left_out() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("extrato_25165-8.pdf");
        std::fs::write(&good, b"%PDF").unwrap();
        let inputs = read_statements(&[good, dir.path().join("missing.pdf")]);
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].name, "extrato_25165-8.pdf");
    }

    #[test]
    fn no_directory_means_raw_identifiers() {
        let names = name_resolver(&NamesConfig::default()).unwrap();
        assert_eq!(names.resolve("12.345.678/0001-90").unwrap(), None);
    }
}
