use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use gestocam::dataset::Dataset;
use gestocam::gesture_classifier::{GestureClassifier, ModelInput};
use gestocam::labels::LabelTable;
use gestocam::logging;
use gestocam::types::{FEATURE_LEN, FRAME_LIMIT};

const USAGE: &str =
    "Uso: replay_dataset [--model m.onnx] [--labels labels.json] [--frame-limit n] [--top n] <dataset.json>";

struct ReplayOptions {
    model_path: PathBuf,
    labels_path: PathBuf,
    frame_limit: usize,
    top: usize,
}

fn parse_args() -> Result<(PathBuf, ReplayOptions)> {
    let mut opts = ReplayOptions {
        model_path: PathBuf::from("models/gesture_sequence.onnx"),
        labels_path: PathBuf::from("labels.json"),
        frame_limit: FRAME_LIMIT,
        top: 5,
    };
    let mut dataset_path: Option<PathBuf> = None;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        let mut value = |name: &str| args.next().ok_or_else(|| anyhow!("Falta valor para {}\n{}", name, USAGE));

        match arg.as_str() {
            "--model" => opts.model_path = PathBuf::from(value("--model")?),
            "--labels" => opts.labels_path = PathBuf::from(value("--labels")?),
            "--frame-limit" => {
                opts.frame_limit = value("--frame-limit")?
                    .parse()
                    .context("--frame-limit debe ser un entero")?
            }
            "--top" => opts.top = value("--top")?.parse().context("--top debe ser un entero")?,
            _ => {
                if dataset_path.is_some() {
                    bail!("{}", USAGE);
                }
                dataset_path = Some(PathBuf::from(arg));
            }
        }
    }

    let dataset_path = dataset_path.ok_or_else(|| anyhow!("Debes especificar un dataset\n{}", USAGE))?;
    Ok((dataset_path, opts))
}

fn main() -> Result<()> {
    logging::init();
    let (dataset_path, opts) = parse_args()?;
    println!("🎞️  Reproduciendo dataset desde {:?}", dataset_path);

    let dataset = Dataset::load(&dataset_path)?;
    let labels = LabelTable::load(&opts.labels_path)?;
    let mut classifier = GestureClassifier::load(&opts.model_path, labels)?;

    let mut evaluated = 0usize;
    let mut hits = 0usize;

    for (idx, sample) in dataset.samples().iter().enumerate() {
        if sample.sequence.len() != opts.frame_limit {
            println!(
                "⏭️  #{:03} {:?}: {} frames, se esperaban {}",
                idx,
                sample.label,
                sample.sequence.len(),
                opts.frame_limit
            );
            continue;
        }

        let input = ModelInput::from_sequence(&sample.sequence, opts.frame_limit, FEATURE_LEN)?;
        let (prediction, ranked) = classifier.classify_ranked(&input)?;
        let predicted = prediction.display_label();

        let hit = predicted.eq_ignore_ascii_case(&sample.label);
        evaluated += 1;
        if hit {
            hits += 1;
        }

        println!(
            "\n{} #{:03} esperado {:?} → {} ({:.1}%)",
            if hit { "✅" } else { "❌" },
            idx,
            sample.label,
            predicted,
            prediction.confidence
        );

        for (rank, (label, score)) in ranked.iter().take(opts.top).enumerate() {
            println!("  {:>2}. {:<25} {:>6.2}%", rank + 1, label, score * 100.0);
        }
    }

    if evaluated == 0 {
        bail!("Ninguna muestra tiene {} frames", opts.frame_limit);
    }

    println!(
        "\n📊 Precisión: {}/{} ({:.1}%)",
        hits,
        evaluated,
        hits as f32 / evaluated as f32 * 100.0
    );

    Ok(())
}
