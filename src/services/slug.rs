//! URL slug generation
//!
//! Slugs are lowercase ASCII words joined by single hyphens. Accented Latin
//! letters are folded to their base letter, anything else that is not a
//! letter, digit, underscore, space or hyphen is dropped.

/// Maximum stored slug length
pub const MAX_SLUG_LEN: usize = 50;

/// Generate a slug from a title
///
/// `"Réussir sa première vente !"` becomes `"reussir-sa-premiere-vente"`.
/// The result is not length-limited; see [`resolve_slug`].
pub fn generate_slug(title: &str) -> String {
    let mut folded = String::with_capacity(title.len());
    for c in title.chars() {
        fold_char(c, &mut folded);
    }

    let mut result = String::with_capacity(folded.len());
    let mut pending_hyphen = false;
    for c in folded.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_hyphen && !result.is_empty() {
                result.push('-');
            }
            pending_hyphen = false;
            result.push(c);
        } else if c == '-' || c.is_whitespace() {
            pending_hyphen = true;
        }
    }

    result.trim_matches(|c| c == '-' || c == '_').to_string()
}

/// Cut a slug to `max` characters without leaving a trailing hyphen
pub fn truncate_slug(slug: &str, max: usize) -> String {
    let cut: String = slug.chars().take(max).collect();
    cut.trim_end_matches('-').to_string()
}

/// Slug to store for an entity: the explicit one when given, else one
/// derived from the title. `None` when nothing usable remains.
pub fn resolve_slug(explicit: Option<&str>, title: &str) -> Option<String> {
    let source = explicit
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(title);

    let slug = truncate_slug(&generate_slug(source), MAX_SLUG_LEN);
    (!slug.is_empty()).then_some(slug)
}

fn fold_char(c: char, out: &mut String) {
    if c.is_ascii() {
        out.push(c);
        return;
    }

    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' => "a",
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' | 'Ā' => "A",
        'æ' => "ae",
        'Æ' => "AE",
        'ç' | 'ć' | 'č' => "c",
        'Ç' | 'Ć' | 'Č' => "C",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ę' | 'ě' => "e",
        'È' | 'É' | 'Ê' | 'Ë' | 'Ē' | 'Ę' | 'Ě' => "E",
        'ì' | 'í' | 'î' | 'ï' | 'ī' => "i",
        'Ì' | 'Í' | 'Î' | 'Ï' | 'Ī' => "I",
        'ñ' | 'ń' | 'ň' => "n",
        'Ñ' | 'Ń' | 'Ň' => "N",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' => "o",
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' | 'Ō' => "O",
        'œ' => "oe",
        'Œ' => "OE",
        'ß' => "ss",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' => "u",
        'Ù' | 'Ú' | 'Û' | 'Ü' | 'Ū' | 'Ů' => "U",
        'ý' | 'ÿ' => "y",
        'Ý' | 'Ÿ' => "Y",
        'ž' | 'ź' | 'ż' => "z",
        'Ž' | 'Ź' | 'Ż' => "Z",
        'š' | 'ś' => "s",
        'Š' | 'Ś' => "S",
        'ł' => "l",
        'Ł' => "L",
        'ř' => "r",
        'Ř' => "R",
        '\u{2019}' | '\u{2018}' => "",
        c if c.is_whitespace() => " ",
        _ => "",
    };
    out.push_str(folded);
}
