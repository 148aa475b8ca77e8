//! Question bank loading and lookup
//!
//! A [`QuizBank`] is the immutable, validated view of the rows the admin
//! uploaded. Uploads arrive as pipe-delimited text (typically a MySQL
//! client dump, table borders included) and are turned into a bank by
//! [`QuizBank::load`]. Once built, a bank is never mutated: re-uploading
//! replaces it wholesale.

use std::collections::{HashMap, HashSet, hash_map::Entry};

use derive_more::Display;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::bank::{COLUMN_COUNT, COLUMNS};

/// Identifier of a question, shared by all of its option rows
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display)]
pub struct QuestionId(String);

impl QuestionId {
    /// The raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for QuestionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for QuestionId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Identifier of an option within the bank
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display)]
pub struct OptionId(String);

impl OptionId {
    /// The raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for OptionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for OptionId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// One option of one question, as uploaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRow {
    /// Question this option belongs to
    pub question_id: QuestionId,
    /// Question text, repeated on every option row
    pub question_text: String,
    /// Free-form difficulty label
    pub difficulty: String,
    /// Option identifier
    pub option_id: OptionId,
    /// Option text shown to participants
    pub option_text: String,
    /// Whether this option is the correct answer
    pub is_correct: bool,
}

/// Errors that can occur while loading a bank
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Error {
    /// The upload is not UTF-8 text
    #[error("upload is not valid UTF-8 text")]
    Encoding,
    /// Nothing that looks like a data row survived cleaning
    #[error("no valid data rows found in file")]
    NoDataRows,
    /// A row does not have the expected number of columns
    #[error("file has {found} columns, but {expected} were expected")]
    ColumnCountMismatch {
        /// Columns found on the offending row
        found: usize,
        /// Columns every row must have
        expected: usize,
    },
    /// A row could not be interpreted
    #[error("line {line}: {reason}")]
    MalformedRow {
        /// 1-based line number in the upload
        line: usize,
        /// What was wrong with it
        reason: String,
    },
}

/// A problem with the bank's answer key that does not prevent play
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DataIntegrityWarning {
    /// No option of the question is flagged correct
    #[error("could not find correct answer for question {0}")]
    MissingCorrectOption(QuestionId),
    /// More than one option of the question is flagged correct
    #[error("question {0} has {1} options flagged correct; the first one is used")]
    AmbiguousCorrectOption(QuestionId, usize),
}

impl DataIntegrityWarning {
    /// The question the warning is about
    pub fn question_id(&self) -> &QuestionId {
        match self {
            Self::MissingCorrectOption(id) | Self::AmbiguousCorrectOption(id, _) => id,
        }
    }
}

/// Immutable collection of question rows keyed by question id
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QuizBank {
    /// Rows in upload order
    rows: Vec<QuestionRow>,
    /// Unique question ids in order of first appearance
    #[serde(skip)]
    question_ids: Vec<QuestionId>,
    /// Row indices of each question's options, in upload order
    #[serde(skip)]
    options: HashMap<QuestionId, Vec<usize>>,
}

impl QuizBank {
    /// Builds a bank from already-parsed rows
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoDataRows`] for an empty row set and
    /// [`Error::MalformedRow`] if a question/option pair appears twice.
    pub fn from_rows(rows: Vec<QuestionRow>) -> Result<Self, Error> {
        if rows.is_empty() {
            return Err(Error::NoDataRows);
        }

        let mut seen = HashSet::new();
        let mut question_ids = Vec::new();
        let mut options: HashMap<QuestionId, Vec<usize>> = HashMap::new();

        for (index, row) in rows.iter().enumerate() {
            if !seen.insert((&row.question_id, &row.option_id)) {
                return Err(Error::MalformedRow {
                    line: index + 1,
                    reason: format!(
                        "duplicate option {} for question {}",
                        row.option_id, row.question_id
                    ),
                });
            }
            match options.entry(row.question_id.clone()) {
                Entry::Occupied(mut o) => o.get_mut().push(index),
                Entry::Vacant(v) => {
                    question_ids.push(row.question_id.clone());
                    v.insert(vec![index]);
                }
            }
        }

        Ok(Self {
            rows,
            question_ids,
            options,
        })
    }

    /// Parses a pipe-delimited upload into a bank
    ///
    /// Lines are trimmed and dropped when empty, when they carry no `|`, or
    /// when they are table borders (`+---+`, `---`). Framing pipes on
    /// either side of a line are ignored. A first line with a
    /// `question_id` column anywhere is treated as a header and its column
    /// order is honoured; otherwise the columns are taken in [`COLUMNS`]
    /// order.
    ///
    /// # Errors
    ///
    /// See [`Error`]. On error the caller keeps whatever bank it had.
    pub fn load(raw: &[u8]) -> Result<Self, Error> {
        let text = std::str::from_utf8(raw).map_err(|_| Error::Encoding)?;

        let (line_numbers, cleaned): (Vec<usize>, Vec<&str>) = text
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| line.contains('|') && !line.starts_with(['+', '-']))
            .unzip();

        if cleaned.is_empty() {
            return Err(Error::NoDataRows);
        }

        let joined = cleaned.join("\n");
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'|')
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .trim(csv::Trim::All)
            .from_reader(joined.as_bytes());

        let mut records = Vec::with_capacity(cleaned.len());
        for (record, line) in reader.records().zip(line_numbers) {
            let record = record.map_err(|e| Error::MalformedRow {
                line,
                reason: e.to_string(),
            })?;
            let fields = unframe(record.iter().map(str::to_owned).collect_vec());
            if fields.iter().all(String::is_empty) {
                continue;
            }
            records.push((line, fields));
        }

        let mut records = records.into_iter().peekable();
        let layout = match records.peek() {
            Some((_, fields))
                if fields.iter().any(|f| f.eq_ignore_ascii_case(COLUMNS[0])) =>
            {
                let (line, header) = records.next().unwrap_or_default();
                column_layout(line, &header)?
            }
            _ => {
                tracing::warn!("no 'question_id' header found, assuming columns are in order");
                std::array::from_fn(|i| i)
            }
        };

        let mut rows = Vec::new();
        for (line, fields) in records {
            if fields.len() != COLUMN_COUNT {
                return Err(Error::ColumnCountMismatch {
                    found: fields.len(),
                    expected: COLUMN_COUNT,
                });
            }
            let [question_id, question_text, difficulty, option_id, option_text, is_correct] =
                layout.map(|i| fields[i].as_str());

            if question_id.is_empty() || option_id.is_empty() {
                tracing::warn!(line, "skipping row without question or option id");
                continue;
            }

            rows.push(QuestionRow {
                question_id: question_id.into(),
                question_text: question_text.to_owned(),
                difficulty: difficulty.to_owned(),
                option_id: option_id.into(),
                option_text: option_text.to_owned(),
                is_correct: parse_flag(is_correct).ok_or_else(|| Error::MalformedRow {
                    line,
                    reason: format!("is_correct must be 0 or 1, found {is_correct:?}"),
                })?,
            });
        }

        let bank = Self::from_rows(rows)?;
        for warning in bank.integrity_warnings() {
            tracing::warn!(%warning, "question bank integrity");
        }
        Ok(bank)
    }

    /// Number of distinct questions
    pub fn len(&self) -> usize {
        self.question_ids.len()
    }

    /// Checks if the bank holds no questions
    pub fn is_empty(&self) -> bool {
        self.question_ids.is_empty()
    }

    /// All rows in upload order
    pub fn rows(&self) -> &[QuestionRow] {
        &self.rows
    }

    /// Distinct question ids in order of first appearance
    pub fn unique_question_ids(&self) -> &[QuestionId] {
        &self.question_ids
    }

    /// Checks if the bank knows the question
    pub fn contains(&self, question_id: &QuestionId) -> bool {
        self.options.contains_key(question_id)
    }

    /// The option rows of a question, in upload order
    ///
    /// Unknown ids yield an empty list; callers skip such questions.
    pub fn options_for(&self, question_id: &QuestionId) -> Vec<&QuestionRow> {
        self.options
            .get(question_id)
            .map(|indices| indices.iter().map(|&i| &self.rows[i]).collect())
            .unwrap_or_default()
    }

    /// The text of a question, if the bank knows it
    pub fn question_text(&self, question_id: &QuestionId) -> Option<&str> {
        self.options
            .get(question_id)
            .and_then(|indices| indices.first())
            .map(|&i| self.rows[i].question_text.as_str())
    }

    /// The option flagged correct for a question
    ///
    /// When several options are flagged the first one in upload order wins.
    pub fn correct_option(&self, question_id: &QuestionId) -> Option<&OptionId> {
        self.options_for(question_id)
            .into_iter()
            .find(|row| row.is_correct)
            .map(|row| &row.option_id)
    }

    /// Questions whose answer key is missing or ambiguous
    pub fn integrity_warnings(&self) -> Vec<DataIntegrityWarning> {
        self.question_ids
            .iter()
            .filter_map(|id| {
                match self.options_for(id).iter().filter(|row| row.is_correct).count() {
                    0 => Some(DataIntegrityWarning::MissingCorrectOption(id.clone())),
                    1 => None,
                    n => Some(DataIntegrityWarning::AmbiguousCorrectOption(id.clone(), n)),
                }
            })
            .collect()
    }
}

/// Drops the empty edge fields left by framing pipes (`| a | b |`)
///
/// Either side is dropped on its own, and only while the record is wider
/// than a bank row, so a genuinely empty first column survives.
fn unframe(mut fields: Vec<String>) -> Vec<String> {
    if fields.len() > COLUMN_COUNT && fields.first().is_some_and(String::is_empty) {
        fields.remove(0);
    }
    if fields.len() > COLUMN_COUNT && fields.last().is_some_and(String::is_empty) {
        fields.pop();
    }
    fields
}

/// Maps each expected column to its position in the header
fn column_layout(line: usize, header: &[String]) -> Result<[usize; COLUMN_COUNT], Error> {
    if header.len() != COLUMN_COUNT {
        return Err(Error::ColumnCountMismatch {
            found: header.len(),
            expected: COLUMN_COUNT,
        });
    }
    let mut layout = [0; COLUMN_COUNT];
    for (slot, name) in layout.iter_mut().zip(COLUMNS) {
        *slot = header
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::MalformedRow {
                line,
                reason: format!("header is missing column {name}"),
            })?;
    }
    Ok(layout)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}
