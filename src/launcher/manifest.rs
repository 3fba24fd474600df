/// Location of the manifest inside a jar.
pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

/// The main section of a jar manifest.
///
/// Attributes are `Name: value` lines; a line starting with a single space
/// continues the previous value. The main section ends at the first blank
/// line. Attribute names compare case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    attributes: Vec<(String, String)>,
}

impl Manifest {
    pub fn parse(text: &str) -> Self {
        let mut attributes: Vec<(String, String)> = Vec::new();
        for line in text.lines() {
            if line.is_empty() {
                break;
            }
            if let Some(continuation) = line.strip_prefix(' ') {
                if let Some((_, value)) = attributes.last_mut() {
                    value.push_str(continuation);
                }
                continue;
            }
            if let Some((name, value)) = line.split_once(':') {
                let value = value.strip_prefix(' ').unwrap_or(value);
                attributes.push((name.trim().to_string(), value.to_string()));
            }
        }
        Self { attributes }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_main_attributes_with_continuations() {
        let manifest = Manifest::parse(
            "Manifest-Version: 1.0\r\n\
             Start-Class: com.example.VeryLongApplicationClassNameThatW\r\n \
             rapsOntoTheNextLine\r\n\
             Spring-Boot-Lib: BOOT-INF/lib/\r\n\
             \r\n\
             Name: com/example/\r\n\
             Start-Class: ignored\r\n",
        );
        assert_eq!(manifest.get("manifest-version"), Some("1.0"));
        assert_eq!(
            manifest.get("Start-Class"),
            Some("com.example.VeryLongApplicationClassNameThatWrapsOntoTheNextLine")
        );
        assert_eq!(manifest.get("Spring-Boot-Lib"), Some("BOOT-INF/lib/"));
        assert_eq!(manifest.get("Name"), None);
    }

    #[test]
    fn empty_manifest_has_no_attributes() {
        assert_eq!(Manifest::parse("").get("Main-Class"), None);
    }
}
