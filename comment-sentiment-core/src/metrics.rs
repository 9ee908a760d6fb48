use {
    std::io::Cursor,
    anyhow::{bail, Context, Result},
    image::{Rgb, RgbImage},
    serde::Serialize,
    crate::dataset::Label,
};

#[derive(Serialize, Debug)]
pub struct ClassMetrics {
    pub label: Label,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

#[derive(Serialize, Debug)]
pub struct Evaluation {
    pub accuracy: f64,
    pub per_class: Vec<ClassMetrics>,
    // rows: actual, columns: predicted, both in Label::ALL order
    pub confusion: [[u64; 3]; 3],
}

pub fn evaluate(actual: &[Label], predicted: &[Label]) -> Result<Evaluation> {
    if actual.is_empty() {
        bail!("cannot evaluate an empty prediction set");
    }
    if actual.len() != predicted.len() {
        bail!("{} actual labels but {} predictions", actual.len(), predicted.len());
    }

    let mut confusion = [[0u64; 3]; 3];
    for (a, p) in actual.iter().zip(predicted) {
        confusion[a.to_index()][p.to_index()] += 1;
    }

    let correct: u64 = (0..3).map(|i| confusion[i][i]).sum();
    let accuracy = correct as f64 / actual.len() as f64;

    let per_class = Label::ALL.iter()
        .map(|label| {
            let index = label.to_index();
            let true_positives = confusion[index][index] as f64;
            let predicted_positives: u64 = (0..3).map(|row| confusion[row][index]).sum();
            let actual_positives: u64 = confusion[index].iter().sum();

            let precision = ratio(true_positives, predicted_positives as f64);
            let recall = ratio(true_positives, actual_positives as f64);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };

            ClassMetrics {
                label: *label,
                precision,
                recall,
                f1,
            }
        })
        .collect();

    Ok(Evaluation {
        accuracy,
        per_class,
        confusion,
    })
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

const CELL_SIZE: u32 = 80;
const CELL_BORDER: u32 = 2;

/// Renders the confusion matrix as a PNG heatmap (rows: actual, columns:
/// predicted), white for empty cells up to dark blue for the largest one.
pub fn render_confusion_matrix(confusion: &[[u64; 3]; 3]) -> Result<Vec<u8>> {
    let side = CELL_SIZE * 3;
    let max = confusion.iter().flatten().copied().max().unwrap_or(0).max(1) as f64;

    let mut canvas = RgbImage::from_pixel(side, side, Rgb([255, 255, 255]));
    for (row, counts) in confusion.iter().enumerate() {
        for (column, count) in counts.iter().enumerate() {
            let intensity = *count as f64 / max;
            let color = heat_color(intensity);

            let x0 = column as u32 * CELL_SIZE + CELL_BORDER;
            let y0 = row as u32 * CELL_SIZE + CELL_BORDER;
            for y in y0..(row as u32 + 1) * CELL_SIZE - CELL_BORDER {
                for x in x0..(column as u32 + 1) * CELL_SIZE - CELL_BORDER {
                    canvas.put_pixel(x, y, color);
                }
            }
        }
    }

    let mut encoded = Vec::new();
    canvas.write_to(&mut Cursor::new(&mut encoded), image::ImageOutputFormat::Png)
        .context("failed to encode confusion matrix png")?;
    Ok(encoded)
}

fn heat_color(intensity: f64) -> Rgb<u8> {
    let blend = |from: u8, to: u8| (from as f64 + (to as f64 - from as f64) * intensity) as u8;
    Rgb([blend(255, 8), blend(255, 48), blend(255, 107)])
}
