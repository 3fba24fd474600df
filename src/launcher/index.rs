use std::collections::HashSet;

/// A precomputed classpath ordering shipped inside the archive.
///
/// One library per line, either in the list form written by build tools,
/// `- "BOOT-INF/lib/foo.jar"`, or as a bare path. Names without a `/` are
/// relative to the library directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassPathIndex {
    entries: Vec<String>,
}

impl ClassPathIndex {
    pub fn parse(text: &str, lib_dir: &str) -> Self {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            let line = line.strip_prefix("- ").unwrap_or(line).trim();
            let line = line.trim_matches('"');
            if line.is_empty() {
                continue;
            }
            let name = if line.contains('/') {
                line.to_string()
            } else {
                format!("{}{}", lib_dir, line)
            };
            if seen.insert(name.clone()) {
                entries.push(name);
            }
        }
        Self { entries }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e == name)
    }

    /// Put the indexed items first, in index order, followed by the rest in
    /// their original order. Index lines naming nothing present are skipped.
    pub fn order<T>(&self, items: Vec<T>, name: impl Fn(&T) -> &str) -> Vec<T> {
        let mut remaining: Vec<Option<T>> = items.into_iter().map(Some).collect();
        let mut ordered = Vec::with_capacity(remaining.len());
        for indexed in &self.entries {
            let position = remaining
                .iter()
                .position(|item| item.as_ref().is_some_and(|item| name(item) == indexed.as_str()));
            if let Some(item) = position.and_then(|i| remaining[i].take()) {
                ordered.push(item);
            }
        }
        ordered.extend(remaining.into_iter().flatten());
        ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const LIB: &str = "BOOT-INF/lib/";

    #[rstest]
    #[case("- \"BOOT-INF/lib/foo.jar\"\n- \"BOOT-INF/lib/bar.jar\"\n")]
    #[case("BOOT-INF/lib/foo.jar\r\nBOOT-INF/lib/bar.jar\r\n")]
    #[case("foo.jar\n\nbar.jar\nfoo.jar\n")]
    fn parses_every_line_style(#[case] text: &str) {
        let index = ClassPathIndex::parse(text, LIB);
        assert_eq!(
            index.entries(),
            &["BOOT-INF/lib/foo.jar".to_string(), "BOOT-INF/lib/bar.jar".to_string()]
        );
        assert!(index.contains("BOOT-INF/lib/bar.jar"));
        assert!(!index.contains("BOOT-INF/lib/baz.jar"));
    }

    #[test]
    fn orders_indexed_items_first() {
        let index = ClassPathIndex::parse("c.jar\na.jar\nmissing.jar\n", LIB);
        let items = vec![
            "BOOT-INF/lib/a.jar",
            "BOOT-INF/lib/b.jar",
            "BOOT-INF/lib/c.jar",
            "BOOT-INF/lib/d.jar",
        ];
        let ordered = index.order(items, |s| *s);
        assert_eq!(
            ordered,
            vec![
                "BOOT-INF/lib/c.jar",
                "BOOT-INF/lib/a.jar",
                "BOOT-INF/lib/b.jar",
                "BOOT-INF/lib/d.jar",
            ]
        );
    }
}
