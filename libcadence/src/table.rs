//! Flat table persistence for corpus rows
//!
//! Two layouts are supported: CSV with a header row (spreadsheet and
//! dataframe friendly) and JSON Lines. Both are overwritten on every run.

use chrono::{DateTime, SecondsFormat, Utc, Weekday};
use std::borrow::Cow;
use std::io::Write;
use std::path::Path;

use crate::config::TableFormat;
use crate::corpus::{weekday_name, CorpusRow, COLUMNS};
use crate::error::{OutputError, Result};

/// Write `rows` to `path`, replacing any previous table
pub fn write_table(path: &Path, rows: &[CorpusRow], format: TableFormat) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(OutputError::Io)?;
    }

    let file = std::fs::File::create(path).map_err(OutputError::Io)?;
    let mut writer = std::io::BufWriter::new(file);
    match format {
        TableFormat::Csv => write_csv(&mut writer, rows)?,
        TableFormat::Jsonl => write_jsonl(&mut writer, rows)?,
    }
    writer.flush().map_err(OutputError::Io)?;
    Ok(())
}

/// Read a table previously written by [`write_table`]
pub fn read_table(path: &Path, format: TableFormat) -> Result<Vec<CorpusRow>> {
    let content = std::fs::read_to_string(path).map_err(OutputError::Io)?;
    let rows = match format {
        TableFormat::Csv => parse_csv(&content)?,
        TableFormat::Jsonl => parse_jsonl(&content)?,
    };
    Ok(rows)
}

pub fn write_csv<W: Write>(writer: &mut W, rows: &[CorpusRow]) -> Result<()> {
    writeln!(writer, "{}", COLUMNS.join(",")).map_err(OutputError::Io)?;
    for row in rows {
        writeln!(
            writer,
            "{},{},{},{},{},{},{}",
            escape_csv_field(&row.root_user),
            escape_csv_field(&row.follower),
            escape_csv_field(&row.tweet),
            row.is_retweet,
            row.tweet_time.to_rfc3339_opts(SecondsFormat::Secs, true),
            weekday_name(row.weekday),
            row.hour
        )
        .map_err(OutputError::Io)?;
    }
    Ok(())
}

pub fn write_jsonl<W: Write>(writer: &mut W, rows: &[CorpusRow]) -> Result<()> {
    for row in rows {
        let line = serde_json::to_string(row).map_err(OutputError::Serialize)?;
        writeln!(writer, "{}", line).map_err(OutputError::Io)?;
    }
    Ok(())
}

pub fn parse_jsonl(content: &str) -> Result<Vec<CorpusRow>> {
    let mut rows = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let row = serde_json::from_str(line).map_err(|e| OutputError::Malformed {
            line: index + 1,
            reason: e.to_string(),
        })?;
        rows.push(row);
    }
    Ok(rows)
}

pub fn parse_csv(content: &str) -> Result<Vec<CorpusRow>> {
    let mut records = parse_csv_records(content)?.into_iter();

    match records.next() {
        Some(header) if header.iter().map(String::as_str).eq(COLUMNS) => {}
        Some(header) => {
            return Err(OutputError::Malformed {
                line: 1,
                reason: format!("unexpected header '{}'", header.join(",")),
            }
            .into())
        }
        None => return Ok(Vec::new()),
    }

    let mut rows = Vec::new();
    for (index, record) in records.enumerate() {
        let line = index + 2;
        if record.len() == 1 && record[0].is_empty() {
            continue;
        }
        rows.push(row_from_record(record, line)?);
    }
    Ok(rows)
}

fn row_from_record(record: Vec<String>, line: usize) -> Result<CorpusRow> {
    let malformed = |reason: String| OutputError::Malformed { line, reason };

    let [root_user, follower, tweet, is_retweet, tweet_time, weekday, hour]: [String; 7] = record
        .try_into()
        .map_err(|r: Vec<String>| {
            malformed(format!("expected {} columns, found {}", COLUMNS.len(), r.len()))
        })?;

    let is_retweet = is_retweet
        .parse::<bool>()
        .map_err(|_| malformed(format!("invalid is_retweet '{}'", is_retweet)))?;
    let tweet_time = DateTime::parse_from_rfc3339(&tweet_time)
        .map_err(|e| malformed(format!("invalid tweet_time '{}': {}", tweet_time, e)))?
        .with_timezone(&Utc);
    let weekday = weekday
        .parse::<Weekday>()
        .map_err(|_| malformed(format!("invalid weekday '{}'", weekday)))?;
    let hour = hour
        .parse::<u32>()
        .ok()
        .filter(|h| *h < 24)
        .ok_or_else(|| malformed(format!("invalid hour '{}'", hour)))?;

    Ok(CorpusRow {
        root_user,
        follower,
        tweet,
        is_retweet,
        tweet_time,
        weekday,
        hour,
    })
}

/// Quote a field if it contains a delimiter, quote or line break
fn escape_csv_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Split CSV text into records, honouring quoted fields
///
/// Quoted fields may contain commas, doubled quotes and line breaks. Blank
/// lines come back as a single empty field.
pub(crate) fn parse_csv_records(content: &str) -> std::result::Result<Vec<Vec<String>>, OutputError> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
                line += 1;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(OutputError::Malformed {
            line,
            reason: "unterminated quoted field".to_string(),
        });
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn row(tweet: &str, is_retweet: bool) -> CorpusRow {
        CorpusRow {
            root_user: "root".to_string(),
            follower: "erin".to_string(),
            tweet: tweet.to_string(),
            is_retweet,
            tweet_time: Utc.with_ymd_and_hms(2024, 5, 7, 14, 5, 0).unwrap(),
            weekday: Weekday::Tue,
            hour: 14,
        }
    }

    #[test]
    fn test_csv_layout() {
        let mut out = Vec::new();
        write_csv(&mut out, &[row("plain text", false)]).unwrap();
        let text = String::from_utf8(out).unwrap();

        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("root_user,follower,tweet,is_retweet,tweet_time,weekday,hour")
        );
        assert_eq!(
            lines.next(),
            Some("root,erin,plain text,false,2024-05-07T14:05:00Z,Tuesday,14")
        );
    }

    #[test]
    fn test_csv_quotes_awkward_tweets() {
        let awkward = row("say \"hi\", then\nleave", true);
        let mut out = Vec::new();
        write_csv(&mut out, std::slice::from_ref(&awkward)).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\"say \"\"hi\"\", then\nleave\""));

        let parsed = parse_csv(&text).unwrap();
        assert_eq!(parsed, vec![awkward]);
    }

    #[test]
    fn test_parse_csv_rejects_wrong_header() {
        let err = parse_csv("a,b,c\n1,2,3\n").unwrap_err();
        assert!(err.to_string().contains("unexpected header"));
    }

    #[test]
    fn test_parse_csv_reports_bad_hour_line() {
        let content = "root_user,follower,tweet,is_retweet,tweet_time,weekday,hour\n\
                       root,erin,ok,false,2024-05-07T14:05:00Z,Tuesday,14\n\
                       root,erin,bad,false,2024-05-07T14:05:00Z,Tuesday,31\n";
        let err = parse_csv(content).unwrap_err();
        assert!(err.to_string().contains("line 3"));
        assert!(err.to_string().contains("invalid hour"));
    }

    #[test]
    fn test_parse_csv_reports_column_count() {
        let content = "root_user,follower,tweet,is_retweet,tweet_time,weekday,hour\n\
                       root,erin,short\n";
        let err = parse_csv(content).unwrap_err();
        assert!(err.to_string().contains("expected 7 columns, found 3"));
    }

    #[test]
    fn test_unterminated_quote() {
        assert!(parse_csv_records("a,\"open\n").is_err());
    }

    #[test]
    fn test_crlf_records() {
        let records = parse_csv_records("a,b\r\nc,d\r\n").unwrap();
        assert_eq!(records, vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn test_write_table_overwrites() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("corpus.jsonl");

        write_table(&path, &[row("first", false), row("second", true)], TableFormat::Jsonl)
            .unwrap();
        write_table(&path, &[row("third", false)], TableFormat::Jsonl).unwrap();

        let rows = read_table(&path, TableFormat::Jsonl).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].tweet, "third");
    }

    #[test]
    fn test_csv_file_read_back() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("corpus.csv");
        let rows = vec![row("one", false), row("two, with comma", true)];

        write_table(&path, &rows, TableFormat::Csv).unwrap();
        assert_eq!(read_table(&path, TableFormat::Csv).unwrap(), rows);
    }
}
