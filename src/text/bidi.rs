use unicode_bidi::BidiInfo;

/// Splits paragraph text into directional runs, in visual run order.
///
/// Each run is a maximal substring sharing one embedding level. Text that
/// cannot be segmented (empty, or with no paragraph found) comes back as a
/// single run, unmodified.
pub fn split_runs(text: &str) -> Vec<String> {
    if text.is_empty() {
        return vec![String::new()];
    }

    let info = BidiInfo::new(text, None);
    if info.paragraphs.is_empty() {
        return vec![text.to_string()];
    }

    let mut runs = Vec::new();
    for para in &info.paragraphs {
        let (_, level_runs) = info.visual_runs(para, para.range.clone());
        for run in level_runs {
            if let Some(slice) = text.get(run) {
                runs.push(slice.to_string());
            }
        }
    }

    if runs.is_empty() {
        return vec![text.to_string()];
    }
    runs
}

/// Joins the directional runs of `text` with newlines.
pub fn split_mixed_direction(text: &str) -> String {
    split_runs(text).join("\n")
}
