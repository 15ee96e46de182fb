//! Participant directory names.
//!
//! A participant "Иван Петров" is stored under `ipetrov`: the first letter of
//! the first name followed by the last name, transliterated to ASCII and
//! lowercased. Characters that are not letters or digits are dropped so the
//! result is always a single safe path component.

/// Directory slug for a participant.
pub fn participant_slug(first_name: &str, last_name: &str) -> String {
    let initial: String = first_name.trim().chars().take(1).collect();
    let mut slug = transliterate(&initial);
    slug.push_str(&transliterate(last_name.trim()));
    slug
}

/// Lowercase ASCII transliteration of Russian text.
pub fn transliterate(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars().flat_map(char::to_lowercase) {
        match cyrillic(ch) {
            Some(latin) => out.push_str(latin),
            None if ch.is_ascii_alphanumeric() => out.push(ch),
            None => {}
        }
    }
    out
}

fn cyrillic(ch: char) -> Option<&'static str> {
    let latin = match ch {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' => "e",
        'ё' => "yo",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'й' => "j",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "h",
        'ц' => "c",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "shh",
        'ъ' | 'ь' => "",
        'ы' => "y",
        'э' => "e",
        'ю' => "yu",
        'я' => "ya",
        _ => return None,
    };
    Some(latin)
}
