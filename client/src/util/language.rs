//! File extension to language-name mapping.

#[cfg(test)]
#[path = "language_test.rs"]
mod language_test;

/// Language assumed when nothing better is known.
pub const FALLBACK_LANGUAGE: &str = "javascript";

const LANGUAGE_NAMES: &[(&str, &str)] = &[
    ("javascript", "javascript"),
    ("js", "javascript"),
    ("typescript", "typescript"),
    ("ts", "typescript"),
    ("python", "python"),
    ("py", "python"),
    ("java", "java"),
    ("cpp", "cpp"),
    ("c", "c"),
    ("csharp", "csharp"),
    ("cs", "csharp"),
    ("php", "php"),
    ("html", "html"),
    ("css", "css"),
    ("json", "json"),
    ("xml", "xml"),
    ("markdown", "markdown"),
    ("md", "markdown"),
    ("sql", "sql"),
    ("bash", "bash"),
    ("shell", "bash"),
    ("sh", "bash"),
    ("yaml", "yaml"),
    ("yml", "yaml"),
    ("go", "go"),
    ("rust", "rust"),
    ("rs", "rust"),
    ("ruby", "ruby"),
    ("rb", "ruby"),
    ("swift", "swift"),
    ("kotlin", "kotlin"),
    ("dart", "dart"),
    ("vue", "vue"),
    ("svelte", "svelte"),
    ("jsx", "jsx"),
    ("tsx", "tsx"),
];

/// Extension after the last dot, if any.
#[must_use]
pub fn extension(file_name: &str) -> Option<&str> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
}

/// Canonical language name for an alias or extension, if known.
#[must_use]
pub fn lookup(name: &str) -> Option<&'static str> {
    let normalized = name.trim().to_lowercase();
    LANGUAGE_NAMES
        .iter()
        .find(|(alias, _)| *alias == normalized)
        .map(|(_, language)| *language)
}

/// Canonical language name, falling back to [`FALLBACK_LANGUAGE`].
#[must_use]
pub fn normalize(name: Option<&str>) -> &'static str {
    name.and_then(lookup).unwrap_or(FALLBACK_LANGUAGE)
}

/// Language of a file, judged by its extension.
#[must_use]
pub fn for_file(file_name: &str) -> &'static str {
    normalize(extension(file_name))
}
