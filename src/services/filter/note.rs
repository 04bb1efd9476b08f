//! Note predicates.
//!
//! A note predicate decodes the raw note bytes into text, then applies a single string
//! comparison. A note that cannot be decoded, or decodes to something other than text,
//! never matches.

use base64::{
	alphabet,
	engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
	Engine as _,
};
use regex::Regex;

use crate::models::{NoteEncoding, NoteRuleSpec};

/// Standard alphabet, padding optional
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
	&alphabet::STANDARD,
	GeneralPurposeConfig::new()
		.with_decode_padding_mode(DecodePaddingMode::Indifferent)
		.with_decode_allow_trailing_bits(true),
);

/// The comparison applied to a decoded note
#[derive(Debug, Clone)]
pub enum NoteMatcher {
	/// Any note is present
	Present,
	Regex(Regex),
	Includes(String),
	StartsWith(String),
	EndsWith(String),
	Exact(String),
	/// Criteria that can never be met, such as a missing comparison or a bad regex
	Never(String),
}

/// Compiled note criteria of a rule
#[derive(Debug, Clone)]
pub struct NotePredicate {
	encoding: NoteEncoding,
	matcher: NoteMatcher,
}

impl NotePredicate {
	/// Compiles note criteria
	///
	/// When several comparisons are set, the first of `has`, `regex`, `includes`,
	/// `startsWith`, `endsWith`, `exact` wins. `has: true` matches any present note
	/// without decoding it. Criteria that cannot be evaluated compile to
	/// [`NoteMatcher::Never`], so the rule stays in place and matches nothing.
	pub fn compile(spec: &NoteRuleSpec) -> Self {
		let matcher = if spec.has == Some(true) {
			NoteMatcher::Present
		} else if let Some(pattern) = &spec.regex {
			match Regex::new(pattern) {
				Ok(re) => NoteMatcher::Regex(re),
				Err(e) => NoteMatcher::Never(format!("invalid note regex {:?}: {}", pattern, e)),
			}
		} else if let Some(value) = &spec.includes {
			NoteMatcher::Includes(value.clone())
		} else if let Some(value) = &spec.starts_with {
			NoteMatcher::StartsWith(value.clone())
		} else if let Some(value) = &spec.ends_with {
			NoteMatcher::EndsWith(value.clone())
		} else if let Some(value) = &spec.exact {
			NoteMatcher::Exact(value.clone())
		} else {
			NoteMatcher::Never("note rule has no comparison".to_string())
		};

		Self {
			encoding: spec.encoding.unwrap_or_default(),
			matcher,
		}
	}

	/// Why the predicate can never match, if it cannot
	pub fn unmatchable_reason(&self) -> Option<&str> {
		match &self.matcher {
			NoteMatcher::Never(reason) => Some(reason),
			_ => None,
		}
	}

	pub fn encoding(&self) -> NoteEncoding {
		self.encoding
	}

	pub fn matcher(&self) -> &NoteMatcher {
		&self.matcher
	}

	/// Evaluates the predicate against a transaction's note; an absent note never matches
	pub fn evaluate(&self, note: Option<&[u8]>) -> bool {
		let Some(note) = note else {
			return false;
		};
		match self.matcher {
			NoteMatcher::Present => return true,
			NoteMatcher::Never(_) => return false,
			_ => {}
		}
		let Some(text) = decode(self.encoding, note) else {
			return false;
		};

		match &self.matcher {
			NoteMatcher::Present => true,
			NoteMatcher::Regex(re) => re.is_match(&text),
			NoteMatcher::Includes(value) => text.contains(value.as_str()),
			NoteMatcher::StartsWith(value) => text.starts_with(value.as_str()),
			NoteMatcher::EndsWith(value) => text.ends_with(value.as_str()),
			NoteMatcher::Exact(value) => text == *value,
			NoteMatcher::Never(_) => false,
		}
	}
}

/// Decodes note bytes into text, `None` when they do not hold text in `encoding`
pub fn decode(encoding: NoteEncoding, note: &[u8]) -> Option<String> {
	match encoding {
		NoteEncoding::Raw => std::str::from_utf8(note).ok().map(str::to_string),
		NoteEncoding::Base64 => {
			let text = std::str::from_utf8(note).ok()?.trim();
			let decoded = LENIENT_BASE64.decode(text).ok()?;
			// Non-ascii payloads are treated as undecodable, not masked down to 7 bits
			if decoded.is_empty() || !decoded.is_ascii() {
				return None;
			}
			String::from_utf8(decoded).ok()
		}
		NoteEncoding::Msgpack => {
			let mut reader = note;
			let value = rmpv::decode::read_value(&mut reader).ok()?;
			if !reader.is_empty() {
				return None;
			}
			value
				.as_str()
				.filter(|s| !s.is_empty())
				.map(str::to_string)
		}
	}
}
