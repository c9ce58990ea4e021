//! Category tags for stat grouping and conditional modifier gating

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Bit-flag set of category tags.
    ///
    /// Categories serve two distinct purposes:
    /// - static grouping on a [`StatDefinition`](crate::registry::StatDefinition)
    ///   (e.g. "show all Defense stats"),
    /// - dynamic gating on a stat value instance, where a modifier with a
    ///   non-empty `required_categories` mask only applies while the value's
    ///   active set contains every required bit.
    ///
    /// The empty set never satisfies a non-empty required mask.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct CategorySet: u64 {
        // Damage source
        const ATTACK      = 1 << 0;
        const SPELL       = 1 << 1;
        // Damage types
        const PHYSICAL    = 1 << 2;
        const FIRE        = 1 << 3;
        const COLD        = 1 << 4;
        const LIGHTNING   = 1 << 5;
        const CHAOS       = 1 << 6;
        const ELEMENTAL   = 1 << 7;
        const POISON      = 1 << 8;
        const BLEED       = 1 << 9;
        // Delivery
        const MELEE       = 1 << 10;
        const RANGED      = 1 << 11;
        const PROJECTILE  = 1 << 12;
        const AREA        = 1 << 13;
        const DURATION    = 1 << 14;
        const CHANNELLING = 1 << 15;
        const TRIGGER     = 1 << 16;
        // Role
        const OFFENSE     = 1 << 17;
        const DEFENSE     = 1 << 18;
        const UTILITY     = 1 << 19;
        const VITAL       = 1 << 20;
        const RESOURCE    = 1 << 21;
        const RECOVERY    = 1 << 22;
        const MOVEMENT    = 1 << 23;
        const CRITICAL    = 1 << 24;
        const SPEED       = 1 << 25;
        const RESISTANCE  = 1 << 26;
        const PENETRATION = 1 << 27;
        // Gameplay groups
        const MINION      = 1 << 28;
        const TOTEM       = 1 << 29;
        const AURA        = 1 << 30;
        const CURSE       = 1 << 31;
        const TRAP        = 1 << 32;
        const GOLEM       = 1 << 33;
        const BRAND       = 1 << 34;
        const WARCRY      = 1 << 35;
    }
}

impl CategorySet {
    /// Mask-containment test: does this set contain every bit of `required`?
    ///
    /// Note that `CategorySet::empty().contains_all(mask)` is `false` for any
    /// non-empty `mask`, so an empty active set never satisfies a gate.
    pub fn contains_all(&self, required: CategorySet) -> bool {
        self.contains(required)
    }

    /// Look up a single category by name, case-insensitively.
    ///
    /// Used by the config loader, which stores categories as strings. The
    /// generated `from_name` only accepts exact flag names, hence this
    /// separate helper.
    pub fn parse_name(name: &str) -> Option<CategorySet> {
        Self::all()
            .iter_names()
            .find(|(flag_name, _)| flag_name.eq_ignore_ascii_case(name))
            .map(|(_, flags)| flags)
    }

    /// Names of the set bits, in flag-declaration order, lowercased.
    ///
    /// The ordering is fixed by the flag declarations, which keeps any id
    /// derived from a category set deterministic.
    pub fn names(&self) -> Vec<String> {
        self.iter_names()
            .map(|(name, _)| name.to_ascii_lowercase())
            .collect()
    }
}

impl fmt::Display for CategorySet {
    /// Human-readable join, e.g. `Fire | Projectile`. The empty set prints
    /// as `None`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "None");
        }
        let mut first = true;
        for (name, _) in self.iter_names() {
            if !first {
                write!(f, " | ")?;
            }
            first = false;
            let mut chars = name.chars();
            match chars.next() {
                Some(c) => write!(f, "{}{}", c, chars.as_str().to_ascii_lowercase())?,
                None => {}
            }
        }
        Ok(())
    }
}
