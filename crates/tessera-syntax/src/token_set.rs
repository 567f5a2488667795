//! A compact, `const`-constructible set of [`SyntaxKind`]s.
//!
//! Used for recovery sets, trivia filters and layered-lexer activation sets.
//! Sets are built once at compile time and passed around by value.

use crate::syntax_kind::SyntaxKind;

const WORDS: usize = SyntaxKind::COUNT.div_ceil(64);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TokenSet([u64; WORDS]);

impl TokenSet {
    pub const EMPTY: TokenSet = TokenSet([0; WORDS]);

    pub const fn new(kinds: &[SyntaxKind]) -> TokenSet {
        let mut bits = [0u64; WORDS];
        let mut i = 0;
        while i < kinds.len() {
            let raw = kinds[i] as usize;
            bits[raw / 64] |= 1u64 << (raw % 64);
            i += 1;
        }
        TokenSet(bits)
    }

    pub const fn union(self, other: TokenSet) -> TokenSet {
        let mut bits = self.0;
        let mut i = 0;
        while i < WORDS {
            bits[i] |= other.0[i];
            i += 1;
        }
        TokenSet(bits)
    }

    pub const fn contains(&self, kind: SyntaxKind) -> bool {
        let raw = kind as usize;
        self.0[raw / 64] & (1u64 << (raw % 64)) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|w| *w == 0)
    }

    /// Iterates the kinds in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = SyntaxKind> + '_ {
        ALL_KINDS.iter().copied().filter(|k| self.contains(*k))
    }
}

impl std::fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

// Every kind once, for iteration. `TesseraLang::kind_from_raw` has the same
// bound check; this avoids transmute in a hot loop.
static ALL_KINDS: std::sync::LazyLock<Vec<SyntaxKind>> = std::sync::LazyLock::new(|| {
    use rowan::Language;
    (0..SyntaxKind::COUNT as u16)
        .map(|raw| crate::syntax_kind::TesseraLang::kind_from_raw(rowan::SyntaxKind(raw)))
        .collect()
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership() {
        let set = TokenSet::new(&[SyntaxKind::L_PAREN, SyntaxKind::ERROR]);
        assert!(set.contains(SyntaxKind::L_PAREN));
        assert!(set.contains(SyntaxKind::ERROR));
        assert!(!set.contains(SyntaxKind::R_PAREN));
    }

    #[test]
    fn union_combines_both_sides() {
        let a = TokenSet::new(&[SyntaxKind::SEMICOLON]);
        let b = TokenSet::new(&[SyntaxKind::R_BRACE, SyntaxKind::VPATH_KW]);
        let both = a.union(b);
        assert!(both.contains(SyntaxKind::SEMICOLON));
        assert!(both.contains(SyntaxKind::VPATH_KW));
        assert_eq!(both.iter().count(), 3);
    }

    #[test]
    fn empty_set() {
        assert!(TokenSet::EMPTY.is_empty());
        assert!(!TokenSet::new(&[SyntaxKind::EOF]).is_empty());
    }
}
