//! Plain-text rendering for terminal output.

use std::fmt::Write;

use predict_shared::{ClassifiedLink, ConsensusBlock, ConsensusEntry, CveRecord};

/// Render a vulnerability record.
pub(crate) fn record(record: &CveRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", record.id);
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", record.description);

    if !record.commit_links.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Commits:");
        for link in &record.commit_links {
            let _ = writeln!(
                out,
                "  {}/{} {}  {}",
                link.repo_owner,
                link.repo_name,
                short(&link.commit_hash),
                link.canonical_url
            );
            let _ = writeln!(out, "    from {}", link.original_url);
        }
    }

    if !record.opaque_links.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "References:");
        for url in &record.opaque_links {
            let _ = writeln!(out, "  {url}");
        }
    }
    out
}

/// Render classification results, one line per input URL.
pub(crate) fn classified(links: &[ClassifiedLink]) -> String {
    let mut out = String::new();
    for link in links {
        match link {
            ClassifiedLink::Commit(c) => {
                let _ = writeln!(
                    out,
                    "commit  {}/{} {}  {}",
                    c.repo_owner,
                    c.repo_name,
                    short(&c.commit_hash),
                    c.canonical_url
                );
            }
            ClassifiedLink::Opaque { url } => {
                let _ = writeln!(out, "opaque  {url}");
            }
        }
    }
    out
}

/// Render consensus blocks for `focal`.
pub(crate) fn blocks(blocks: &[ConsensusBlock], focal: &str) -> String {
    if blocks.is_empty() {
        return "No annotations found.\n".to_string();
    }

    let mut out = String::new();
    for block in blocks {
        if block.focal_present {
            let _ = writeln!(
                out,
                "{}  {:.0}% agree with {focal}",
                block.cve_id, block.agreement_percentage
            );
        } else {
            let _ = writeln!(out, "{}  not annotated by {focal}", block.cve_id);
        }
        for entry in &block.entries {
            out.push_str(&entry_line(entry));
        }
        let _ = writeln!(out);
    }
    out
}

fn entry_line(entry: &ConsensusEntry) -> String {
    let a = &entry.annotation;
    let marker = match entry.agreement {
        None => "*",
        Some(ag) if ag.is_full() => "=",
        Some(ag) if ag.fix_matches || ag.intro_matches => "~",
        Some(_) => "x",
    };
    format!(
        "  {marker} {:<12} {}/{}  fix {} {}  intro {} {}\n",
        a.username,
        a.repo_owner,
        a.repo_name,
        short(&a.fix_commit),
        a.fix_file,
        short(&a.intro_commit),
        a.intro_file
    )
}

/// Abbreviated commit hash for display.
fn short(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}
