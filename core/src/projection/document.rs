//! Column-oriented projection output and its JSON rendering

use serde::{Serialize, Deserialize};
use serde_json::{json, Map, Value};

use super::columns::ColumnKey;
use super::row::ResultRow;

/// Display metadata of one prompt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptContext {
    /// Prompt label
    pub display_label: Option<String>,

    /// Prompt type
    pub prompt_type: Option<String>,

    /// Display type
    pub display_type: Option<String>,

    /// Unit
    pub unit: Option<String>,
}

impl PromptContext {
    /// Context taken from the first row answering the prompt
    pub fn from_row(row: &ResultRow) -> Self {
        PromptContext {
            display_label: row.display_label.clone(),
            prompt_type: row.prompt_type.clone(),
            display_type: row.display_type.clone(),
            unit: row.unit.clone(),
        }
    }
}

/// One output column: one value per meta-row
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column key
    pub key: ColumnKey,

    /// Prompt metadata, prompt columns only
    pub context: Option<PromptContext>,

    /// Values in meta-row order
    pub values: Vec<Value>,
}

/// Projection result
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Columns in output order
    pub columns: Vec<Column>,

    /// Number of meta-rows
    pub row_count: usize,

    /// Number of input rows (answered prompts)
    pub prompt_count: usize,
}

impl Document {
    /// Column URNs in output order
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.key.urn()).collect()
    }

    /// Look up a column by URN
    pub fn column(&self, urn: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.key.urn() == urn)
    }

    /// Render the read API response body
    pub fn to_json(&self) -> Value {
        let data: Vec<Value> = self
            .columns
            .iter()
            .map(|column| {
                let mut body = Map::new();
                if let Some(context) = &column.context {
                    body.insert(
                        "context".to_string(),
                        json!({
                            "unit": context.unit,
                            "prompt_type": context.prompt_type,
                            "display_type": context.display_type,
                            "display_label": context.display_label,
                        }),
                    );
                }
                body.insert("values".to_string(), Value::Array(column.values.clone()));

                let mut entry = Map::new();
                entry.insert(column.key.urn(), Value::Object(body));
                Value::Object(entry)
            })
            .collect();

        json!({
            "result": "success",
            "metadata": {
                "number_of_prompts": self.prompt_count,
                "number_of_surveys": self.row_count,
                "items": self.column_names(),
            },
            "data": data,
        })
    }
}
