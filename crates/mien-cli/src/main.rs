use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use mien_capture::{FrameSource, ImageDirSource};
use mien_core::artifact::ArtifactStore;
use mien_core::config::Config;
use mien_core::deletion::{DeletionCoordinator, DeletionError};
use mien_core::enroll::{EnrollmentCoordinator, EnrollmentProfile};
use mien_core::reconcile::{scan_frame, Reconciler, RecognitionDecision};
use mien_core::samples::SampleRepository;
use mien_core::training::{TrainingCoordinator, TrainingError, TrainingMode};
use mien_core::{CancelFlag, FullFrameDetector, GalleryRecognizer, IdentityStore, Recognizer};
use mien_store::SqliteIdentityStore;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mien", about = "Mien face enrollment and recognition CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll a new identity from a frame source
    Enroll {
        #[arg(short, long)]
        name: String,
        #[arg(long)]
        age: Option<u32>,
        #[arg(long)]
        gender: Option<String>,
        #[arg(long, default_value = "")]
        notes: String,
        /// Samples to capture (default from MIEN_TARGET_SAMPLES)
        #[arg(long)]
        samples: Option<usize>,
        /// Directory of frames to capture from
        #[arg(long)]
        source: PathBuf,
    },
    /// Capture additional samples for an existing identity
    Augment {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        samples: Option<usize>,
        #[arg(long)]
        source: PathBuf,
        /// Extend the trained artifact with this identity's samples
        #[arg(long)]
        update: bool,
    },
    /// Rebuild the recognition artifact from all stored samples
    Train,
    /// Identify faces in a frame source
    Recognize {
        #[arg(long)]
        source: PathBuf,
    },
    /// List enrolled identities
    List,
    /// Delete an identity and its samples
    Remove { id: i64 },
    /// Show store and artifact status
    Status {
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    let store = SqliteIdentityStore::open(&config.db_path)
        .with_context(|| format!("opening identity store at {}", config.db_path.display()))?;
    let samples = SampleRepository::new(&config.samples_dir);
    let artifact = ArtifactStore::new(config.model_path.clone());

    match cli.command {
        Commands::Enroll {
            name,
            age,
            gender,
            notes,
            samples: target,
            source,
        } => {
            let name = name.trim().to_string();
            if name.is_empty() {
                bail!("name must not be empty");
            }

            let target = target.unwrap_or(config.target_samples);
            let mut frames = ImageDirSource::open(&source)?;
            let cancel = cancel_on_ctrl_c();
            let coordinator = EnrollmentCoordinator::new(&store, &samples);

            let profile = EnrollmentProfile {
                name: name.clone(),
                age,
                gender,
                notes,
            };
            let result = tokio::task::block_in_place(|| {
                coordinator.enroll(profile, target, &mut frames, &FullFrameDetector, &cancel)
            })?;

            if result.committed {
                println!(
                    "Enrolled {name} with id {} ({} samples captured)",
                    result.id, result.captured
                );
                println!("Run `mien train` to include them in the artifact");
            } else {
                println!("No samples captured; identity not created");
            }
        }

        Commands::Augment {
            id,
            samples: target,
            source,
            update,
        } => {
            let target = target.unwrap_or(config.target_samples);
            let mut frames = ImageDirSource::open(&source)?;
            let cancel = cancel_on_ctrl_c();
            let coordinator = EnrollmentCoordinator::new(&store, &samples);

            let captured = tokio::task::block_in_place(|| {
                coordinator.augment(id, target, &mut frames, &FullFrameDetector, &cancel)
            })?;
            println!("Captured {captured} additional samples for id {id}");

            if update && captured > 0 {
                let (images, labels) = samples.load_for(id)?;
                let trainer = TrainingCoordinator::new(&samples, &artifact);
                let mut recognizer = GalleryRecognizer::new();
                let report = trainer.update_incremental(&mut recognizer, &images, &labels)?;
                print_training_report(&report);
            } else if captured > 0 {
                println!("Run `mien train` to include them in the artifact");
            }
        }

        Commands::Train => {
            let trainer = TrainingCoordinator::new(&samples, &artifact);
            let mut recognizer = GalleryRecognizer::new();
            match trainer.train_full(&mut recognizer) {
                Ok(report) => print_training_report(&report),
                Err(TrainingError::NoTrainingData) => {
                    println!("No training data; capture samples first");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Commands::Recognize { source } => {
            if !artifact.exists() {
                println!("No trained artifact; run `mien train` first");
                return Ok(());
            }
            let mut recognizer = GalleryRecognizer::new();
            recognizer
                .restore(artifact.model_path())
                .context("restoring recognition artifact")?;

            let reconciler = Reconciler::new(&store, config.confidence_threshold);
            let mut frames = ImageDirSource::open(&source)?;
            let cancel = cancel_on_ctrl_c();
            let detector = FullFrameDetector;

            tokio::task::block_in_place(|| -> Result<()> {
                while !cancel.is_cancelled() {
                    let frame = match frames.next_frame() {
                        Ok(Some(frame)) => frame,
                        Ok(None) => break,
                        Err(e) => {
                            tracing::warn!(error = %e, "frame source failed");
                            break;
                        }
                    };

                    let predictions = scan_frame(&frame, &detector, &recognizer);
                    for decision in reconciler.reconcile(&predictions)? {
                        print_decision(&decision);
                    }
                }
                Ok(())
            })?;
        }

        Commands::List => {
            let people = store.list_all()?;
            if people.is_empty() {
                println!("No identities enrolled");
            } else {
                println!("{:<5} {:<20} {:<5} {:<8} Notes", "ID", "Name", "Age", "Gender");
                for identity in people {
                    println!(
                        "{:<5} {:<20} {:<5} {:<8} {}",
                        identity.id,
                        identity.name,
                        identity
                            .age
                            .map(|a| a.to_string())
                            .unwrap_or_else(|| "-".to_string()),
                        identity.gender.as_deref().unwrap_or("-"),
                        identity.notes,
                    );
                }
            }
        }

        Commands::Remove { id } => {
            let coordinator = DeletionCoordinator::new(&store, &samples, &artifact);
            match coordinator.delete(id) {
                Ok(result) => {
                    println!(
                        "Deleted {} (id {}), removed {} samples",
                        result.name, result.id, result.samples_removed
                    );
                    if result.artifact_stale {
                        println!(
                            "The trained artifact still references label {id}; run `mien train` to rebuild"
                        );
                    }
                }
                Err(DeletionError::NotFound(_)) => bail!("identity {id} not found"),
                Err(e) => return Err(e.into()),
            }
        }

        Commands::Status { json } => {
            let people = store.list_all()?;
            let manifest = artifact.manifest()?;
            let trainer = TrainingCoordinator::new(&samples, &artifact);
            let staleness = trainer.staleness(&store)?;

            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "identities": people.len(),
                        "artifact": {
                            "present": artifact.exists(),
                            "trained_at": manifest.as_ref().map(|m| m.trained_at.to_rfc3339()),
                            "labels": manifest.as_ref().map(|m| m.labels.clone()),
                            "samples": manifest.as_ref().map(|m| m.sample_count),
                        },
                        "untrained": staleness.untrained,
                        "orphaned": staleness.orphaned,
                    })
                );
            } else {
                println!("identities: {}", people.len());
                match &manifest {
                    Some(m) => println!(
                        "artifact: trained {} ({} samples, {} labels)",
                        m.trained_at, m.sample_count, m.labels.len()
                    ),
                    None => println!("artifact: untrained"),
                }
                if staleness.is_consistent() {
                    println!("stores are consistent");
                } else {
                    if !staleness.untrained.is_empty() {
                        println!("identities not in artifact: {:?}", staleness.untrained);
                    }
                    if !staleness.orphaned.is_empty() {
                        println!("artifact labels with no identity: {:?}", staleness.orphaned);
                    }
                }
            }
        }
    }

    Ok(())
}

/// Flip a shared cancel flag when Ctrl-C arrives.
fn cancel_on_ctrl_c() -> CancelFlag {
    let cancel = CancelFlag::new();
    let flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("cancellation requested");
            flag.cancel();
        }
    });
    cancel
}

fn print_training_report(report: &mien_core::training::TrainingReport) {
    let mode = match report.mode {
        TrainingMode::Full => "full retrain",
        TrainingMode::Incremental => "incremental update",
        TrainingMode::ColdStart => "full retrain (no prior artifact)",
    };
    println!(
        "Artifact trained: {mode}, {} samples across {} identities",
        report.samples, report.identities
    );
}

fn print_decision(decision: &RecognitionDecision) {
    match decision {
        RecognitionDecision::Recognized {
            identity, distance, ..
        } => {
            println!(
                "recognized: {} (id {}, distance {:.1})",
                identity.name, identity.id, distance
            );
        }
        RecognitionDecision::Unknown { distance, .. } => {
            println!("unknown face (distance {distance:.1})");
        }
        RecognitionDecision::OrphanLabel {
            label, distance, ..
        } => {
            println!(
                "orphaned label {label} (distance {distance:.1}) — no identity record; retrain to clear"
            );
        }
    }
}
