//! Folder label normalization: provider prefixes, Portuguese names, and type
//! inference for folders the backend left as `custom`.

use crate::models::{Folder, FolderRef, FolderType};

const NAME_TRANSLATIONS: &[(&str, &str)] = &[
    ("all mail", "Todos os e-mails"),
    ("todos os e mails", "Todos os e-mails"),
    ("sent mail", "Enviados"),
    ("sent", "Enviados"),
    ("drafts", "Rascunhos"),
    ("spam", "Spam"),
    ("junk", "Spam"),
    ("trash", "Lixeira"),
    ("bin", "Lixeira"),
    ("important", "Importante"),
    ("starred", "Com estrela"),
    ("marcados", "Com estrela"),
    ("archive", "Arquivados"),
    ("arquivados", "Arquivados"),
];

const TYPE_KEYWORDS: &[(FolderType, &[&str])] = &[
    (FolderType::Inbox, &["inbox", "entrada"]),
    (FolderType::Sent, &["sent", "enviad"]),
    (FolderType::Drafts, &["draft", "rascunho"]),
    (FolderType::Spam, &["spam", "junk", "lixo"]),
    (FolderType::Archive, &["archive", "arquiv", "all mail"]),
    (FolderType::Trash, &["trash", "lixeira", "excluid", "deleted", "bin"]),
];

pub fn type_label(folder_type: FolderType) -> &'static str {
    match folder_type {
        FolderType::Inbox => "Caixa de entrada",
        FolderType::Sent => "Enviados",
        FolderType::Drafts => "Rascunhos",
        FolderType::Spam => "Spam",
        FolderType::Archive => "Arquivados",
        FolderType::Trash => "Lixeira",
        FolderType::Important => "Importante",
        FolderType::Custom => "Pasta personalizada",
        FolderType::Local => crate::models::LOCAL_FOLDER_LABEL,
    }
}

/// Strip the combining mark from common precomposed Latin letters.
fn fold_char(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'Á' | 'À' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'A',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        'ç' => 'c',
        'Ç' => 'C',
        'ñ' => 'n',
        'Ñ' => 'N',
        'ý' | 'ÿ' => 'y',
        'Ý' => 'Y',
        other => other,
    }
}

/// Lowercase ASCII key: diacritics folded, punctuation turned into single
/// spaces. `"Todos os E-mails"` becomes `"todos os e mails"`.
pub fn normalize_folder_key(value: &str) -> String {
    let mapped: String = value
        .trim()
        .chars()
        .map(|c| fold_char(c).to_ascii_lowercase())
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { ' ' })
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drop a leading `[Gmail]/`-style segment, collapse repeated slashes and
/// trim slashes and whitespace from both ends.
pub fn strip_provider_prefix(label: &str) -> String {
    let mut raw = label.trim_start();
    if let Some(rest) = raw.strip_prefix('[') {
        if let Some(close) = rest.find(']') {
            if close > 0 {
                raw = rest[close + 1..].trim_start();
                raw = raw.strip_prefix('/').unwrap_or(raw);
            }
        }
    }

    let mut collapsed = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == '/' && collapsed.ends_with('/') {
            continue;
        }
        collapsed.push(c);
    }
    collapsed
        .trim_matches(|c: char| c == '/' || c.is_whitespace())
        .to_string()
}

/// Human label for a folder name: known names are translated, unknown names
/// pass through cleaned, and a blank name falls back to the type label.
pub fn translate_folder_label(label: &str, folder_type: FolderType) -> String {
    let cleaned = strip_provider_prefix(label);
    let key = normalize_folder_key(&cleaned);
    if let Some((_, translated)) = NAME_TRANSLATIONS.iter().find(|(k, _)| *k == key) {
        return (*translated).to_string();
    }
    if !cleaned.is_empty() {
        return cleaned;
    }
    type_label(folder_type).to_string()
}

/// Resolve a folder's type. An explicit non-custom type wins; otherwise the
/// label is searched for well-known keywords.
pub fn infer_folder_type(
    raw_type: Option<&str>,
    display_name: Option<&str>,
    remote_name: Option<&str>,
) -> FolderType {
    let explicit = raw_type.and_then(FolderType::parse);
    if let Some(t) = explicit.filter(|t| *t != FolderType::Custom) {
        return t;
    }
    let label = normalize_folder_key(display_name.or(remote_name).unwrap_or(""));
    if label.is_empty() {
        return FolderType::Custom;
    }
    TYPE_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| label.contains(w)))
        .map(|(t, _)| *t)
        .unwrap_or(FolderType::Custom)
}

pub fn is_trash_like(folder: Option<&FolderRef>) -> bool {
    folder.is_some_and(|f| matches!(f.folder_type, FolderType::Trash | FolderType::Spam))
}

fn label_source<'a>(display_name: &'a Option<String>, remote_name: &'a Option<String>) -> &'a str {
    display_name
        .as_deref()
        .or(remote_name.as_deref())
        .unwrap_or("")
}

/// Label for a folder embedded in a thread or message payload.
pub fn folder_ref_label(folder: Option<&FolderRef>) -> String {
    match folder {
        Some(f) => translate_folder_label(label_source(&f.display_name, &f.remote_name), f.folder_type),
        None => type_label(FolderType::Custom).to_string(),
    }
}

impl Folder {
    pub fn label(&self) -> String {
        translate_folder_label(
            label_source(&self.display_name, &self.remote_name),
            self.folder_type,
        )
    }

    /// Re-type a `custom` folder from its name.
    pub fn with_inferred_type(mut self) -> Self {
        self.folder_type = infer_folder_type(
            Some(self.folder_type.as_str()),
            self.display_name.as_deref(),
            self.remote_name.as_deref(),
        );
        self
    }
}
