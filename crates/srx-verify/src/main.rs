//! Verification pipeline CLI.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use srx_verify::client::{ChatClient, EutilsResolver, LlmAdjudicator, LlmExtractor, LlmVerifier};
use srx_verify::external::Adjudicator;
use srx_verify::output::{apply_outputs, write_audit_json, JsonlWorkbook, TextReviewLog};
use srx_verify::view::make_view;
use srx_verify::{abba, pipeline, FinalDocument, PipelineConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "srx-verify")]
#[command(about = "Two-agent verification pipeline for systematic-review extraction")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the pipeline over one or more paper text files
    Run {
        /// Paper text files, processed in order
        #[arg(required = true)]
        texts: Vec<PathBuf>,

        /// Output directory for audit, workbook, and review-log files
        #[arg(short, long)]
        out_dir: PathBuf,

        /// Run both role orders (ABBA) and reconcile their outputs
        #[arg(long)]
        abba: bool,

        /// Refuse on cross-driver mismatches instead of adjudicating them
        #[arg(long)]
        no_adjudicate: bool,
    },

    /// Compare two audit documents and report mismatching paths
    Compare {
        /// Audit JSON from run A
        #[arg(short, long)]
        a: PathBuf,

        /// Audit JSON from run B
        #[arg(short, long)]
        b: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                "srx_verify=info"
                    .parse()
                    .expect("directive is compile-time constant"),
            ),
        )
        .init();

    let args = Args::parse();

    match args.command {
        Command::Run {
            texts,
            out_dir,
            abba,
            no_adjudicate,
        } => run(&texts, &out_dir, abba, !no_adjudicate).await?,
        Command::Compare { a, b } => compare(&a, &b)?,
    }

    Ok(())
}

async fn run(texts: &[PathBuf], out_dir: &Path, abba: bool, adjudicate: bool) -> Result<()> {
    let mut config = PipelineConfig::from_env();
    config.adjudication_enabled = adjudicate;

    fs::create_dir_all(out_dir).context("Failed to create output directory")?;

    let client = ChatClient::new()?;
    let extractor = LlmExtractor::new(client.clone(), config.driver_model.clone());
    let verifier = LlmVerifier::new(client.clone(), config.verifier_model.clone());
    let adjudicator = LlmAdjudicator::new(client.clone(), config.adjudicator_model.clone());
    // role-swapped pair for the second ABBA run
    let extractor_b = LlmExtractor::new(client.clone(), config.verifier_model.clone());
    let verifier_b = LlmVerifier::new(client, config.driver_model.clone());
    let resolver = EutilsResolver::new()?;

    let mut workbook = JsonlWorkbook::new(out_dir.join("records.jsonl"));
    let mut review_log = TextReviewLog::new(out_dir.join("review_log.txt"));

    for text_path in texts {
        info!(path = %text_path.display(), "processing paper");
        let full_text = fs::read_to_string(text_path)
            .with_context(|| format!("Failed to read {}", text_path.display()))?;

        let document = pipeline::run_document(
            &extractor,
            &verifier,
            Some(&resolver),
            &config,
            &full_text,
        )
        .await?;

        if abba {
            // second run with the agent roles swapped, then reconcile
            let document_b = pipeline::run_document(
                &extractor_b,
                &verifier_b,
                Some(&resolver),
                &config,
                &full_text,
            )
            .await?;

            let view = make_view(&full_text, config.max_view_chars);
            let adjudicator_ref: Option<&dyn Adjudicator> = config
                .adjudication_enabled
                .then_some(&adjudicator as &dyn Adjudicator);
            let reconciled =
                abba::run_abba(&document, &document_b, adjudicator_ref, &config, &view).await?;
            let path = out_dir.join(audit_name(&document, "reconciled"));
            fs::write(&path, serde_json::to_string_pretty(&reconciled)?)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }

        let audit_path = out_dir.join(audit_name(&document, "audit"));
        write_audit_json(&audit_path, &document)?;
        apply_outputs(&document, &mut workbook, &mut review_log)?;

        info!(
            pmid = ?document.paper_id.pmid,
            study_type = %document.study_type,
            needs_human_review = document.validation.needs_human_review,
            "paper done"
        );
    }

    Ok(())
}

fn audit_name(document: &FinalDocument, kind: &str) -> String {
    let pmid = document
        .paper_id
        .pmid
        .map_or_else(|| "unknown".to_string(), |p| p.to_string());
    format!("{kind}_{pmid}.json")
}

fn compare(a: &Path, b: &Path) -> Result<()> {
    let config = PipelineConfig::from_env();
    let doc_a: FinalDocument = serde_json::from_str(
        &fs::read_to_string(a).with_context(|| format!("Failed to read {}", a.display()))?,
    )?;
    let doc_b: FinalDocument = serde_json::from_str(
        &fs::read_to_string(b).with_context(|| format!("Failed to read {}", b.display()))?,
    )?;

    let payload_a = abba::comparison_payload(&doc_a);
    let payload_b = abba::comparison_payload(&doc_b);
    let mismatches = abba::compare(&payload_a, &payload_b, &config);

    if mismatches.is_empty() {
        println!("No mismatches.");
        return Ok(());
    }
    for m in &mismatches {
        println!("{}\t{}\t{}", m.path, m.value_a, m.value_b);
    }
    println!("{} mismatch(es).", mismatches.len());
    Ok(())
}
