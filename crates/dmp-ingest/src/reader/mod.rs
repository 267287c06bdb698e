//! File format readers
//!
//! Turns an uploaded file on disk into an ordered sequence of
//! loosely-typed records. Formats are dispatched by file extension:
//! `.csv`, `.json`, `.xml`, and `.txt` are supported.

use dmp_common::{DmpError, Result};
use serde_json::Value;
use std::io::BufRead;
use std::path::Path;
use tracing::info;

/// XML element tags treated as one record each.
const XML_RECORD_TAGS: &[&str] = &["item", "record", "event"];

/// One loosely-typed record read from a source file.
///
/// Field order follows the order fields appeared in the file. Values
/// keep whatever shape the format gave them: CSV fields are strings,
/// JSON fields keep their parsed type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    fields: Vec<(String, Value)>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, replacing any existing value under the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if let Some(slot) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.fields.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, Value)> for RawRecord {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        let mut record = Self::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

/// Supported source file formats, resolved once by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Json,
    Xml,
    Text,
}

impl FileFormat {
    /// Resolve the format from a path's extension (case-insensitive).
    ///
    /// Fails with `UnsupportedFormat` without touching the filesystem.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "xml" => Ok(Self::Xml),
            "txt" => Ok(Self::Text),
            _ => Err(DmpError::UnsupportedFormat(format!(".{ext}"))),
        }
    }

    /// Read every record from `path` using this format.
    pub fn read(&self, path: &Path) -> Result<Vec<RawRecord>> {
        match self {
            Self::Csv => read_csv(path),
            Self::Json => read_json(path),
            Self::Xml => read_xml(path),
            Self::Text => read_text(path),
        }
    }
}

/// Read a source file end to end: dispatch on extension, verify the
/// file exists, and parse every record.
pub fn read_file(path: &Path) -> Result<Vec<RawRecord>> {
    let format = FileFormat::from_path(path)?;

    if !path.exists() {
        return Err(DmpError::FileNotFound(path.display().to_string()));
    }

    let records = format.read(path)?;
    info!(path = %path.display(), records = records.len(), "Read source file");
    Ok(records)
}

/// CSV: first row is the header, each remaining row is one record.
///
/// Truly blank lines are dropped by the parser; rows of empty fields
/// (e.g. `,,`) are kept so their row indices survive into error
/// reports downstream.
fn read_csv(path: &Path) -> Result<Vec<RawRecord>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let record = headers
            .iter()
            .zip(row.iter())
            .map(|(name, value)| (name.to_string(), Value::String(value.to_string())))
            .collect();
        records.push(record);
    }

    Ok(records)
}

/// JSON: a top-level array, or a single object wrapped as a
/// one-element sequence.
fn read_json(path: &Path) -> Result<Vec<RawRecord>> {
    let content = std::fs::read_to_string(path)?;
    let data: Value = serde_json::from_str(&content)?;

    let elements = match data {
        Value::Array(items) => items,
        Value::Object(_) => vec![data],
        _ => {
            return Err(DmpError::InvalidFormat(
                "JSON must be an object or array".to_string(),
            ))
        },
    };

    // A non-object element becomes an empty record so it keeps its row
    // index and fails that row alone, not the whole file.
    let records = elements
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => map.into_iter().collect(),
            _ => RawRecord::new(),
        })
        .collect();
    Ok(records)
}

/// XML: every `item`/`record`/`event` element anywhere in the document
/// becomes a record; its direct children become fields keyed by tag.
fn read_xml(path: &Path) -> Result<Vec<RawRecord>> {
    let content = std::fs::read_to_string(path)?;
    let root = parse_xml_tree(&content)?;

    let mut records = Vec::new();
    collect_xml_records(&root, &mut records);
    Ok(records)
}

/// Minimal element tree built from the quick-xml event stream.
#[derive(Debug, Default)]
struct XmlElement {
    name: String,
    text: String,
    children: Vec<XmlElement>,
}

fn parse_xml_tree(content: &str) -> Result<XmlElement> {
    use quick_xml::events::Event;

    let mut reader = quick_xml::Reader::from_str(content);
    reader.config_mut().trim_text(true);

    // Synthetic root holds the document's top-level elements
    let mut stack = vec![XmlElement::default()];

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                stack.push(XmlElement {
                    name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
                    ..Default::default()
                });
            },
            Ok(Event::Empty(empty)) => {
                let child = XmlElement {
                    name: String::from_utf8_lossy(empty.name().as_ref()).into_owned(),
                    ..Default::default()
                };
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(child);
                }
            },
            Ok(Event::Text(text)) => {
                let text = text
                    .unescape()
                    .map_err(|e| DmpError::Xml(e.to_string()))?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            },
            Ok(Event::CData(cdata)) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&cdata));
                }
            },
            Ok(Event::End(_)) => {
                if stack.len() > 1 {
                    let finished = stack.pop().unwrap_or_default();
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(finished);
                    }
                }
            },
            Ok(Event::Eof) => break,
            Ok(_) => {},
            Err(e) => return Err(DmpError::Xml(e.to_string())),
        }
    }

    Ok(stack.pop().unwrap_or_default())
}

fn collect_xml_records(element: &XmlElement, records: &mut Vec<RawRecord>) {
    if XML_RECORD_TAGS.contains(&element.name.as_str()) {
        let mut record = RawRecord::new();
        for child in &element.children {
            let value = if child.children.is_empty() {
                if child.text.is_empty() {
                    Value::Null
                } else {
                    Value::String(child.text.clone())
                }
            } else {
                // Children with their own structure are kept as markup text
                Value::String(to_markup(child))
            };
            record.insert(child.name.clone(), value);
        }

        if !record.is_empty() {
            records.push(record);
        }
    }

    for child in &element.children {
        collect_xml_records(child, records);
    }
}

fn to_markup(element: &XmlElement) -> String {
    let mut markup = format!("<{}>", element.name);
    markup.push_str(&element.text);
    for child in &element.children {
        markup.push_str(&to_markup(child));
    }
    markup.push_str(&format!("</{}>", element.name));
    markup
}

/// Text: one record per non-blank line, with its 1-based line number
/// and trimmed content.
fn read_text(path: &Path) -> Result<Vec<RawRecord>> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);

    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let mut record = RawRecord::new();
        record.insert("line_number", Value::from(index as u64 + 1));
        record.insert("content", Value::String(trimmed.to_string()));
        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_fixture(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            FileFormat::from_path(Path::new("data.CSV")).unwrap(),
            FileFormat::Csv
        );
        assert_eq!(
            FileFormat::from_path(Path::new("data.json")).unwrap(),
            FileFormat::Json
        );
        assert_eq!(
            FileFormat::from_path(Path::new("events.Xml")).unwrap(),
            FileFormat::Xml
        );
        assert_eq!(
            FileFormat::from_path(Path::new("log.txt")).unwrap(),
            FileFormat::Text
        );
    }

    #[test]
    fn test_unsupported_extension_fails_before_open() {
        // The file does not exist, so hitting the filesystem would fail
        // with a different error
        let err = read_file(Path::new("/nonexistent/report.pdf")).unwrap_err();
        assert!(matches!(err, DmpError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = read_file(Path::new("/nonexistent/data.csv")).unwrap_err();
        assert!(matches!(err, DmpError::FileNotFound(_)));
    }

    #[test]
    fn test_csv_header_and_rows() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(
            &dir,
            "events.csv",
            "disaster_type,location_name,severity\nflood,Venice,High\n\nearthquake,Tokyo,Critical\n",
        );

        let records = read_file(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].get("disaster_type"),
            Some(&Value::String("flood".to_string()))
        );
        assert_eq!(
            records[1].get("severity"),
            Some(&Value::String("Critical".to_string()))
        );
    }

    #[test]
    fn test_json_array() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(
            &dir,
            "events.json",
            r#"[{"type": "flood", "location": "Venice"}, {"type": "wildfire", "location": "Athens"}]"#,
        );

        let records = read_file(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[1].get("location"),
            Some(&Value::String("Athens".to_string()))
        );
    }

    #[test]
    fn test_csv_row_of_empty_fields_is_kept() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(
            &dir,
            "gaps.csv",
            "disaster_type,location_name\nflood,Venice\n,\nearthquake,Tokyo\n",
        );

        let records = read_file(&path).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(
            records[1].get("disaster_type"),
            Some(&Value::String(String::new()))
        );
        assert_eq!(
            records[2].get("location_name"),
            Some(&Value::String("Tokyo".to_string()))
        );
    }

    #[test]
    fn test_json_array_non_object_element_becomes_empty_record() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(
            &dir,
            "mixed.json",
            r#"[{"type": "flood", "location": "Venice"}, 42, {"type": "wildfire"}]"#,
        );

        let records = read_file(&path).unwrap();
        assert_eq!(records.len(), 3);
        assert!(records[1].is_empty());
        assert_eq!(
            records[2].get("type"),
            Some(&Value::String("wildfire".to_string()))
        );
    }

    #[test]
    fn test_json_single_object_wraps_to_one_record() {
        let dir = TempDir::new().unwrap();
        let single = write_fixture(&dir, "one.json", r#"{"type": "flood", "lat": 45.4}"#);
        let wrapped = write_fixture(&dir, "many.json", r#"[{"type": "flood", "lat": 45.4}]"#);

        assert_eq!(read_file(&single).unwrap(), read_file(&wrapped).unwrap());
    }

    #[test]
    fn test_json_scalar_root_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir, "bad.json", "42");

        let err = read_file(&path).unwrap_err();
        assert!(matches!(err, DmpError::InvalidFormat(_)));
    }

    #[test]
    fn test_json_malformed_fails_whole_file() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir, "bad.json", r#"[{"type": "flood""#);

        assert!(read_file(&path).is_err());
    }

    #[test]
    fn test_xml_record_elements() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(
            &dir,
            "events.xml",
            r#"<data>
                <item><type>flood</type><location>Venice</location></item>
                <record><type>cyclone</type><wind_speed>120</wind_speed></record>
                <ignored><type>ghost</type></ignored>
            </data>"#,
        );

        let records = read_file(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].get("location"),
            Some(&Value::String("Venice".to_string()))
        );
        assert_eq!(
            records[1].get("wind_speed"),
            Some(&Value::String("120".to_string()))
        );
    }

    #[test]
    fn test_xml_nested_child_kept_as_markup() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(
            &dir,
            "nested.xml",
            "<data><event><type>flood</type><extra><a>1</a></extra></event></data>",
        );

        let records = read_file(&path).unwrap();
        assert_eq!(records.len(), 1);
        let markup = records[0].get("extra").unwrap().as_str().unwrap();
        assert!(markup.contains("<a>1</a>"));
    }

    #[test]
    fn test_xml_malformed_fails() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir, "bad.xml", "<data><item><type>flood</item></data>");

        assert!(matches!(read_file(&path), Err(DmpError::Xml(_))));
    }

    #[test]
    fn test_text_lines() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir, "notes.txt", "first line\n\n  third line  \n");

        let records = read_file(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("line_number"), Some(&Value::from(1u64)));
        assert_eq!(
            records[0].get("content"),
            Some(&Value::String("first line".to_string()))
        );
        assert_eq!(records[1].get("line_number"), Some(&Value::from(3u64)));
        assert_eq!(
            records[1].get("content"),
            Some(&Value::String("third line".to_string()))
        );
    }

    #[test]
    fn test_raw_record_insert_replaces() {
        let mut record = RawRecord::new();
        record.insert("a", Value::from(1));
        record.insert("b", Value::from(2));
        record.insert("a", Value::from(3));

        assert_eq!(record.len(), 2);
        assert_eq!(record.get("a"), Some(&Value::from(3)));
    }
}
