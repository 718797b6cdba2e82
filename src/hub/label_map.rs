use std::{collections::BTreeMap, fs, path::Path};

use crate::error::{HubError, IoContext, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub id: i64,
    pub name: String,
}

pub type LabelMap = BTreeMap<i64, Label>;

pub fn load_label_map(path: &Path) -> Result<LabelMap> {
    let text = fs::read_to_string(path).io_context(|| format!("read label map {}", path.display()))?;
    parse_label_map(&text).map_err(|reason| HubError::InvalidConfig {
        path: path.to_path_buf(),
        reason,
    })
}

/// Parses `item { id: N  name: 'x' }` records.
///
/// An `id` line is paired with the next line carrying a `key: value` pair;
/// that value, stripped of quotes, is the label name.
pub fn parse_label_map(text: &str) -> std::result::Result<LabelMap, String> {
    let mut labels = LabelMap::new();
    let mut lines = text.lines().enumerate();

    while let Some((number, line)) = lines.next() {
        let Some(raw_id) = field_value(line, "id") else {
            continue;
        };
        let id = raw_id
            .parse::<i64>()
            .map_err(|_| format!("line {}: id {raw_id:?} is not an integer", number + 1))?;

        let name = lines
            .by_ref()
            .map(|(_, next)| next)
            .find(|next| next.contains(':'))
            .and_then(|next| next.rsplit(':').next())
            .map(|value| value.trim().trim_matches(|c| c == '\'' || c == '"').to_string())
            .ok_or_else(|| format!("line {}: id {id} has no name", number + 1))?;

        labels.insert(id, Label { id, name });
    }

    Ok(labels)
}

fn field_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let (field, value) = line.trim().split_once(':')?;
    (field.trim() == key).then(|| value.trim())
}
