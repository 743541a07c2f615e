#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum TokenKind {
  Digits,
  Colon,
  Dash,
  Space,
  Word
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct Token<'a> {
  pub kind:   TokenKind,
  pub text:   &'a str,
  /// Byte offset of `text` inside the clause.
  pub offset: usize
}

impl Token<'_> {
  pub fn end(&self) -> usize {
    self.offset + self.text.len()
  }
}

fn classify(ch: char) -> TokenKind {
  if ch.is_ascii_digit() {
    TokenKind::Digits
  } else if ch == ':' {
    TokenKind::Colon
  } else if ch == '-' {
    TokenKind::Dash
  } else if ch.is_whitespace() {
    TokenKind::Space
  } else {
    TokenKind::Word
  }
}

/// Splits a clause into runs of digits, whitespace and words; `:` and `-`
/// are always single-character tokens.
pub fn tokenize(
  clause: &str
) -> Vec<Token<'_>> {
  let mut tokens = Vec::new();
  let mut start: Option<(
    usize,
    TokenKind
  )> = None;

  for (idx, ch) in clause.char_indices()
  {
    let kind = classify(ch);
    let single = matches!(
      kind,
      TokenKind::Colon
        | TokenKind::Dash
    );

    if let Some((from, current)) = start
      && (current != kind || single)
    {
      tokens.push(Token {
        kind:   current,
        text:   &clause[from..idx],
        offset: from
      });
      start = None;
    }

    if single {
      tokens.push(Token {
        kind,
        text: &clause
          [idx..idx + ch.len_utf8()],
        offset: idx
      });
    } else if start.is_none() {
      start = Some((idx, kind));
    }
  }

  if let Some((from, kind)) = start {
    tokens.push(Token {
      kind,
      text: &clause[from..],
      offset: from
    });
  }

  tokens
}
