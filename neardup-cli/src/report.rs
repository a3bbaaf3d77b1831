//! Duplicate group reporters: terminal display and NDJSON export.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use neardup_core::types::Document;
use neardup_engine::{ClusterReport, RunSummary};

/// Print each duplicate group's document texts, cut to `print_width`
/// characters, with `---` after every group. Members without text in
/// `texts` (known only from the index) print their id instead.
pub fn display_groups<W: Write>(
    out: &mut W,
    report: &ClusterReport,
    texts: &HashMap<String, String>,
    print_width: usize,
) -> io::Result<()> {
    for group in report.duplicate_groups() {
        for id in &group.members {
            match texts.get(id) {
                Some(text) => writeln!(out, "{}", truncate(text, print_width))?,
                None => writeln!(out, "<{id}: indexed earlier, text not loaded>")?,
            }
        }
        writeln!(out, "---")?;
    }
    Ok(())
}

/// Texts of every document that belongs to a duplicate group.
pub fn group_texts<I>(report: &ClusterReport, docs: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = Document>,
{
    docs.into_iter()
        .filter(|doc| {
            report
                .assignment(&doc.id)
                .is_some_and(|a| report.clusters[a.cluster_id].is_duplicate_group())
        })
        .map(|doc| (doc.id, doc.text))
        .collect()
}

/// One JSON array of ids per duplicate group, representative first.
pub fn write_groups<W: Write>(out: &mut W, report: &ClusterReport) -> io::Result<()> {
    for group in report.duplicate_groups() {
        serde_json::to_writer(&mut *out, &group.members)?;
        out.write_all(b"\n")?;
    }
    Ok(())
}

pub fn export_groups(path: &Path, report: &ClusterReport) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_groups(&mut out, report)?;
    out.flush()?;
    tracing::info!(path = %path.display(), groups = report.duplicate_group_count(), "saved duplicate groups");
    Ok(())
}

pub fn print_summary<W: Write>(out: &mut W, summary: &RunSummary) -> io::Result<()> {
    writeln!(
        out,
        "{}: {} documents, {} skipped, {} candidate pairs, {} duplicate groups ({} ms)",
        summary.mode,
        summary.documents_processed,
        summary.skipped_count(),
        summary.candidate_pairs,
        summary.duplicate_groups,
        summary.duration_ms,
    )?;
    for skipped in &summary.skipped {
        writeln!(
            out,
            "  skipped {} [{}] {}",
            skipped.doc_id.as_deref().unwrap_or("<no id>"),
            skipped.code,
            skipped.reason
        )?;
    }
    Ok(())
}

fn truncate(text: &str, width: usize) -> &str {
    match text.char_indices().nth(width) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neardup_core::types::DocInterner;
    use neardup_engine::{DuplicateClusterer, VerifiedEdge};

    fn report() -> ClusterReport {
        let mut interner = DocInterner::new();
        let a = interner.intern("a");
        let b = interner.intern("b");
        interner.intern("c");
        let edge = VerifiedEdge { left: a, right: b, similarity: 0.9 };
        DuplicateClusterer::new().cluster(&interner, &[true; 3], &[edge])
    }

    #[test]
    fn export_is_one_line_per_group_representative_first() {
        let mut out = Vec::new();
        write_groups(&mut out, &report()).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "[\"a\",\"b\"]\n");
    }

    #[test]
    fn display_truncates_and_separates_groups() {
        let texts = group_texts(
            &report(),
            vec![
                Document::new("a", "héllo world"),
                Document::new("b", "hi"),
                Document::new("c", "not a duplicate"),
            ],
        );
        assert!(!texts.contains_key("c"));

        let mut out = Vec::new();
        display_groups(&mut out, &report(), &texts, 5).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "héllo\nhi\n---\n");
    }

    #[test]
    fn missing_text_prints_the_id() {
        let mut out = Vec::new();
        display_groups(&mut out, &report(), &HashMap::new(), 10).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("<a: "));
    }
}
