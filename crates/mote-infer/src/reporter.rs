use crate::OutputTensor;
use std::io::Write;

/// Consumer of a successful cycle's output.
///
/// The view is valid only for the duration of the call; copy values out to
/// keep them.
pub trait ResultReporter {
    fn report(&mut self, output: &OutputTensor<'_>);
}

impl<F> ResultReporter for F
where
    F: FnMut(&OutputTensor<'_>),
{
    fn report(&mut self, output: &OutputTensor<'_>) {
        self(output)
    }
}

/// One class index with its score.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Classification {
    pub index: usize,
    pub score: f32,
}

/// The `k` highest scores, best first. Equal scores keep index order; NaN
/// scores are skipped.
pub fn top_k(output: &OutputTensor<'_>, k: usize) -> Vec<Classification> {
    let mut ranked: Vec<Classification> = output
        .iter()
        .enumerate()
        .filter(|(_, score)| !score.is_nan())
        .map(|(index, score)| Classification { index, score })
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(k);
    ranked
}

fn label_for(labels: &[String], index: usize) -> String {
    labels
        .get(index)
        .cloned()
        .unwrap_or_else(|| format!("class {index}"))
}

/// Logs the top classes at `info`.
#[derive(Debug, Clone)]
pub struct LogReporter {
    labels: Vec<String>,
    top_k: usize,
}

impl LogReporter {
    pub fn new(labels: Vec<String>, top_k: usize) -> Self {
        Self {
            labels,
            top_k: top_k.max(1),
        }
    }
}

impl ResultReporter for LogReporter {
    fn report(&mut self, output: &OutputTensor<'_>) {
        let ranked = top_k(output, self.top_k);
        let summary: Vec<String> = ranked
            .iter()
            .map(|c| format!("{} ({:.4})", label_for(&self.labels, c.index), c.score))
            .collect();
        log::info!("top {}: {}", ranked.len(), summary.join(", "));
    }
}

/// Writes every output value to `writer`, followed by the best class.
///
/// ```text
/// Inference results: 0.0100 0.9000 ...
/// Top class: 1 (0.9000)
/// ```
pub struct PrintReporter<W: Write> {
    writer: W,
    labels: Vec<String>,
}

impl PrintReporter<std::io::Stdout> {
    pub fn stdout(labels: Vec<String>) -> Self {
        Self::new(std::io::stdout(), labels)
    }
}

impl<W: Write> PrintReporter<W> {
    pub fn new(writer: W, labels: Vec<String>) -> Self {
        Self { writer, labels }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_output(&mut self, output: &OutputTensor<'_>) -> std::io::Result<()> {
        let scores = output
            .to_tensor()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let values: Vec<String> = scores.as_slice().iter().map(|v| format!("{v:.4}")).collect();
        writeln!(self.writer, "Inference results: {}", values.join(" "))?;
        if let Some(index) = scores.argmax() {
            let name = match self.labels.get(index) {
                Some(label) => format!("{} {}", index, label),
                None => index.to_string(),
            };
            writeln!(self.writer, "Top class: {} ({:.4})", name, scores.data[index])?;
        }
        self.writer.flush()
    }
}

impl<W: Write> ResultReporter for PrintReporter<W> {
    fn report(&mut self, output: &OutputTensor<'_>) {
        if let Err(e) = self.write_output(output) {
            log::warn!("failed to print inference results: {e}");
        }
    }
}
