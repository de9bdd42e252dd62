//! Character conventions used across FlyBase text: Greek letters and
//! superscript/subscript markup in each of the encodings a report may read or
//! write.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// `alpha`, `w[1118]`, `P[[ch]]`
    Plain,
    /// `&agr;`, `w[1118]`, `P[[ch]]`
    Proforma,
    /// `&agr;`, `w<up>1118</up>`, `P<down>ch</down>`
    ChadoSgml,
    /// `&alpha;`, `w<sup>1118</sup>`, `P<sub>ch</sub>`
    Html,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Encoding::Plain => "plain",
            Encoding::Proforma => "proforma",
            Encoding::ChadoSgml => "chado_sgml",
            Encoding::Html => "html",
        };
        write!(f, "{name}")
    }
}

/// SGML entity stem and English name for each Greek letter.
const GREEK: &[(&str, &str)] = &[
    ("agr", "alpha"),
    ("bgr", "beta"),
    ("ggr", "gamma"),
    ("dgr", "delta"),
    ("egr", "epsilon"),
    ("zgr", "zeta"),
    ("eegr", "eta"),
    ("thgr", "theta"),
    ("igr", "iota"),
    ("kgr", "kappa"),
    ("lgr", "lambda"),
    ("mgr", "mu"),
    ("ngr", "nu"),
    ("xgr", "xi"),
    ("ogr", "omicron"),
    ("pgr", "pi"),
    ("rgr", "rho"),
    ("sgr", "sigma"),
    ("tgr", "tau"),
    ("ugr", "upsilon"),
    ("phgr", "phi"),
    ("khgr", "chi"),
    ("psgr", "psi"),
    ("ohgr", "omega"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Markup {
    Greek { index: usize, upper: bool },
    SupOpen,
    SupClose,
    SubOpen,
    SubClose,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Text(String),
    Markup(Markup),
}

impl Markup {
    fn opener(self) -> Option<Markup> {
        match self {
            Markup::SupClose => Some(Markup::SupOpen),
            Markup::SubClose => Some(Markup::SubOpen),
            _ => None,
        }
    }
}

impl Encoding {
    fn render(self, markup: Markup) -> String {
        match markup {
            Markup::Greek { index, upper } => {
                let (stem, name) = GREEK[index];
                match self {
                    Encoding::Plain => cased(name, upper),
                    Encoding::Proforma | Encoding::ChadoSgml => format!("&{};", sgml_stem(stem, upper)),
                    Encoding::Html => format!("&{};", cased(name, upper)),
                }
            }
            Markup::SupOpen => match self {
                Encoding::Plain | Encoding::Proforma => "[".to_string(),
                Encoding::ChadoSgml => "<up>".to_string(),
                Encoding::Html => "<sup>".to_string(),
            },
            Markup::SupClose => match self {
                Encoding::Plain | Encoding::Proforma => "]".to_string(),
                Encoding::ChadoSgml => "</up>".to_string(),
                Encoding::Html => "</sup>".to_string(),
            },
            Markup::SubOpen => match self {
                Encoding::Plain | Encoding::Proforma => "[[".to_string(),
                Encoding::ChadoSgml => "<down>".to_string(),
                Encoding::Html => "<sub>".to_string(),
            },
            Markup::SubClose => match self {
                Encoding::Plain | Encoding::Proforma => "]]".to_string(),
                Encoding::ChadoSgml => "</down>".to_string(),
                Encoding::Html => "</sub>".to_string(),
            },
        }
    }

    /// Markup patterns recognized when reading text in this encoding,
    /// longest first. Greek names are not recognized in plain text.
    fn patterns(self) -> Vec<(String, Markup)> {
        let mut patterns = Vec::new();
        if self != Encoding::Plain {
            for index in 0..GREEK.len() {
                for upper in [false, true] {
                    let markup = Markup::Greek { index, upper };
                    patterns.push((self.render(markup), markup));
                }
            }
        }
        for markup in [Markup::SubOpen, Markup::SubClose, Markup::SupOpen, Markup::SupClose] {
            patterns.push((self.render(markup), markup));
        }
        patterns.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        patterns
    }

    /// A closer only counts when it closes the innermost open markup, so
    /// `x[[a[1]]]` reads as a superscript nested in a subscript. Stray closers
    /// stay literal text.
    fn tokenize(self, text: &str) -> Vec<Token> {
        let patterns = self.patterns();
        let mut tokens = Vec::new();
        let mut open: Vec<Markup> = Vec::new();
        let mut literal = String::new();
        let mut rest = text;
        'outer: while let Some(ch) = rest.chars().next() {
            for (pattern, markup) in &patterns {
                if !rest.starts_with(pattern.as_str()) {
                    continue;
                }
                match markup {
                    Markup::SupOpen | Markup::SubOpen => open.push(*markup),
                    Markup::SupClose | Markup::SubClose => {
                        if open.last().copied() != markup.opener() {
                            continue;
                        }
                        open.pop();
                    }
                    Markup::Greek { .. } => {}
                }
                if !literal.is_empty() {
                    tokens.push(Token::Text(std::mem::take(&mut literal)));
                }
                tokens.push(Token::Markup(*markup));
                rest = &rest[pattern.len()..];
                continue 'outer;
            }
            literal.push(ch);
            rest = &rest[ch.len_utf8()..];
        }
        if !literal.is_empty() {
            tokens.push(Token::Text(literal));
        }
        tokens
    }
}

fn cased(name: &str, upper: bool) -> String {
    if !upper {
        return name.to_string();
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

fn sgml_stem(stem: &str, upper: bool) -> String {
    if !upper {
        return stem.to_string();
    }
    let letters = stem.trim_end_matches("gr");
    format!("{}gr", letters.to_ascii_uppercase())
}

pub fn convert(text: &str, from: Encoding, to: Encoding) -> String {
    if from == to {
        return text.to_string();
    }
    from.tokenize(text)
        .into_iter()
        .map(|token| match token {
            Token::Text(text) => text,
            Token::Markup(markup) => to.render(markup),
        })
        .collect()
}

/// Flattens curator free text onto one line: tabs and line breaks become
/// spaces, runs of spaces collapse, ends are trimmed.
pub fn clean_free_text(text: &str) -> String {
    text.split(|ch: char| ch == ' ' || ch == '\t' || ch == '\n' || ch == '\r')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
