//! Record Loader: reads the graded quiz response dataset into typed records.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Columns the dashboard contract requires in the dataset header.
/// Header names are verbatim from the source spreadsheet export.
pub const REQUIRED_COLUMNS: [&str; 11] = [
    "student_id",
    "Topic",
    "Subtopic",
    "mistake category",
    "topical skill level",
    "maximum_mark",
    "mark_awarded",
    "Mistake?",
    "q_text",
    "model solution",
    "student answer",
];

/// Cell value in the `Mistake?` column that marks a row as a mistake.
pub const MISTAKE_SENTINEL: &str = "y";

/// Some exports carry the question text under this column instead of `q_text`.
const Q_TEXT_FALLBACK: &str = "q_text1";

/// Fatal input errors: the run aborts, no aggregation is attempted.
#[derive(Debug, Error)]
pub enum DataSourceError {
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} has no header row", path.display())]
    NoHeader { path: PathBuf },
    #[error("{} contains a header but no records", path.display())]
    Empty { path: PathBuf },
    #[error("failed to parse {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// One graded question attempt by one student.
///
/// Grading fields stay as text: the dashboard displays them verbatim and no
/// arithmetic is performed on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRecord {
    pub student_id: String,
    pub topic: String,
    pub subtopic: String,
    pub skill_level: String,
    pub is_mistake: bool,
    /// Present only for mistake rows with a non-empty category cell
    pub mistake_category: Option<String>,
    pub max_mark: String,
    pub awarded_mark: String,
    pub question_text: String,
    pub model_solution: String,
    pub student_answer: String,
}

/// Loader output: records in input order plus the columns the header lacked.
#[derive(Debug)]
pub struct LoadedDataset {
    pub records: Vec<ResponseRecord>,
    /// Required columns absent from the header, in `REQUIRED_COLUMNS` order.
    /// Values for these degrade to empty rather than failing the load.
    pub missing_columns: Vec<String>,
}

/// Read a CSV dataset into response records, preserving row order.
pub fn load_dataset(path: &Path) -> Result<LoadedDataset, DataSourceError> {
    let file = File::open(path).map_err(|source| DataSourceError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(file);

    let headers = reader
        .headers()
        .map_err(|source| DataSourceError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;
    if headers.is_empty() {
        return Err(DataSourceError::NoHeader {
            path: path.to_path_buf(),
        });
    }

    let index: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| (name.to_string(), i))
        .collect();

    let missing_columns: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| !index.contains_key(**col))
        .map(|col| col.to_string())
        .collect();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|source| DataSourceError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;
        records.push(record_from_row(&row, &index));
    }

    if records.is_empty() {
        return Err(DataSourceError::Empty {
            path: path.to_path_buf(),
        });
    }

    Ok(LoadedDataset {
        records,
        missing_columns,
    })
}

fn record_from_row(row: &csv::StringRecord, index: &HashMap<String, usize>) -> ResponseRecord {
    let field = |name: &str| -> &str {
        index
            .get(name)
            .and_then(|&i| row.get(i))
            .unwrap_or_default()
    };

    let category = field("mistake category");
    let question_text = match field("q_text") {
        "" => field(Q_TEXT_FALLBACK),
        text => text,
    };

    ResponseRecord {
        student_id: field("student_id").to_string(),
        topic: field("Topic").to_string(),
        subtopic: field("Subtopic").to_string(),
        skill_level: field("topical skill level").to_string(),
        is_mistake: field("Mistake?") == MISTAKE_SENTINEL,
        mistake_category: if category.is_empty() {
            None
        } else {
            Some(category.to_string())
        },
        max_mark: field("maximum_mark").to_string(),
        awarded_mark: field("mark_awarded").to_string(),
        question_text: question_text.to_string(),
        model_solution: field("model solution").to_string(),
        student_answer: field("student answer").to_string(),
    }
}
