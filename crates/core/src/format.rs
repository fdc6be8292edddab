use crate::{
    notes::StudyNotes,
    types::{ConnectionInsight, Verdict},
};

/// Split `H:MM:SS` / `MM:SS` into hours, minutes, seconds. Sub-second parts
/// after `,` or `.` are dropped.
fn split_timestamp(timestamp: &str) -> Option<(u32, u32, u32)> {
    let whole = timestamp.trim().split([',', '.']).next()?;
    let parts = whole
        .split(':')
        .map(|p| p.trim().parse::<u32>().ok())
        .collect::<Option<Vec<_>>>()?;

    match parts.as_slice() {
        [m, s] => Some((0, *m, *s)),
        [h, m, s] => Some((*h, *m, *s)),
        _ => None,
    }
}

/// `None` when the total does not fit in a `u32`.
fn total_seconds(h: u32, m: u32, s: u32) -> Option<u32> {
    h.checked_mul(3600)?
        .checked_add(m.checked_mul(60)?)?
        .checked_add(s)
}

/// Parse `5:30`, `1:05:30` or `00:05:30` into seconds.
pub fn parse_timestamp_to_seconds(timestamp: &str) -> Option<u32> {
    let (h, m, s) = split_timestamp(timestamp)?;
    total_seconds(h, m, s)
}

/// Reformat `HH:MM:SS,mmm` into `H:MM:SS`, or `M:SS` when hours are zero.
/// Milliseconds are truncated. Input that isn't a timestamp comes back as is.
pub fn compact_timestamp(timestamp: &str) -> String {
    let Some(total) = split_timestamp(timestamp).and_then(|(h, m, s)| total_seconds(h, m, s))
    else {
        return timestamp.to_string();
    };

    // normalise overflowing fields, e.g. 00:75:00
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);

    if h == 0 {
        format!("{}:{:02}", m, s)
    } else {
        format!("{}:{:02}:{:02}", h, m, s)
    }
}

fn verdict_marker(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Supported => "✔ supported",
        Verdict::Refuted => "✘ refuted",
        Verdict::PartiallyTrue => "◐ partially true",
        Verdict::Unverifiable => "? unverifiable",
    }
}

/// Format collected study notes as human-readable markdown
pub fn format_notes_readable(notes: &StudyNotes) -> String {
    let mut output = String::new();

    output.push_str(&format!("# Study notes for {}\n\n", notes.video_url));

    if let Some(concepts) = &notes.key_concepts {
        output.push_str("## Key Concepts\n\n");
        for concept in &concepts.key_concepts {
            match &concept.timestamp {
                Some(ts) => output.push_str(&format!(
                    "### {} [{}]\n\n",
                    concept.term,
                    compact_timestamp(ts)
                )),
                None => output.push_str(&format!("### {}\n\n", concept.term)),
            }
            output.push_str(&format!("{}\n\n", concept.definition));
            output.push_str(&format!("*Why it matters:* {}\n\n", concept.relevance));
            if let Some(link) = concept.watch_url(&notes.video_id) {
                output.push_str(&format!("{}\n\n", link));
            }
        }
    }

    if let Some(thesis) = &notes.thesis_arguments {
        output.push_str("## Thesis\n\n");
        output.push_str(&thesis.main_thesis);
        output.push_str("\n\n");

        for chain in &thesis.argument_chains {
            output.push_str(&format!("### {}\n\n", chain.title));
            output.push_str(&format!("**Premise:** {}\n\n", chain.premise));
            for (i, step) in chain.reasoning_steps.iter().enumerate() {
                output.push_str(&format!("{}. {}\n", i + 1, step));
            }
            output.push_str(&format!("\n**Conclusion:** {}\n\n", chain.conclusion));
            if let Some(implications) = &chain.implications {
                output.push_str(&format!("**Implications:** {}\n\n", implications));
            }
        }
    }

    if let Some(connections) = &notes.connections {
        output.push_str("## Connections\n\n");
        let mut shown: Vec<&ConnectionInsight> = Vec::new();
        for c in &connections.connections {
            // A ↔ B and B ↔ A are the same pair
            if shown.iter().any(|s| s.links(&c.concept_a, &c.concept_b)) {
                continue;
            }
            shown.push(c);
            output.push_str(&format!(
                "• {} ↔ {}: {} ({})\n",
                c.concept_a, c.concept_b, c.relationship, c.significance
            ));
        }
        output.push('\n');
        if let Some(synthesis) = &connections.synthesis {
            output.push_str(&format!("{}\n\n", synthesis));
        }
    }

    if let Some(claims) = &notes.verified_claims {
        output.push_str("## Claims\n\n");
        for claim in &claims.verified_claims {
            output.push_str(&format!(
                "• \"{}\" ({}) {}\n  {}\n",
                claim.claim,
                claim.claim_type,
                verdict_marker(claim.verdict),
                claim.reasoning
            ));
            if let Some(evidence) = &claim.evidence {
                output.push_str(&format!("  Evidence: {}\n", evidence));
            }
        }
        output.push('\n');
    }

    if let Some(quiz) = &notes.quiz {
        output.push_str(&format!("## Quiz ({} questions)\n\n", quiz.questions.len()));
        if let Some(focus) = &quiz.quiz_focus {
            output.push_str(&format!("*Focus:* {}\n\n", focus));
        }
    }

    output
}
