//! Stat modifier stacking.
//!
//! Spell stats are shaped by ordered stacks of contributions:
//! - `ValueModifier` is one additive or multiplicative contribution
//! - `ModifierStack` folds contributions over a base value in insertion
//!   order, with no reordering or merging
//! - `StatModifierSet` groups one stack per spell stat (damage, cost,
//!   cooldown, speed) and is passed immutably through a cast

use serde::{Deserialize, Serialize};

/// How a contribution combines with the running value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ModifierOp {
    Add,
    Multiply,
}

/// One contribution to a single stat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueModifier {
    pub op: ModifierOp,
    pub magnitude: f32,
}

impl ValueModifier {
    pub fn add(magnitude: f32) -> Self {
        Self {
            op: ModifierOp::Add,
            magnitude,
        }
    }

    pub fn multiply(magnitude: f32) -> Self {
        Self {
            op: ModifierOp::Multiply,
            magnitude,
        }
    }

    fn fold(self, value: f32) -> f32 {
        match self.op {
            ModifierOp::Add => value + self.magnitude,
            ModifierOp::Multiply => value * self.magnitude,
        }
    }
}

/// Ordered contributions to one stat. Order is application order: the
/// stacks `[x2, +5]` and `[+5, x2]` resolve differently on purpose.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModifierStack {
    entries: Vec<ValueModifier>,
}

impl ModifierStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, modifier: ValueModifier) {
        self.entries.push(modifier);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Left fold over `base` in insertion order.
    pub fn apply(&self, base: f32) -> f32 {
        self.entries.iter().fold(base, |value, m| m.fold(value))
    }

    /// `self` applied first, `outer` after.
    pub fn then(&self, outer: &Self) -> Self {
        let mut entries = Vec::with_capacity(self.entries.len() + outer.entries.len());
        entries.extend_from_slice(&self.entries);
        entries.extend_from_slice(&outer.entries);
        Self { entries }
    }
}

impl FromIterator<ValueModifier> for ModifierStack {
    fn from_iter<I: IntoIterator<Item = ValueModifier>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Contributions across all four spell stats. The default set is the
/// identity: every stack empty, every stat passes through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatModifierSet {
    pub damage: ModifierStack,
    pub cost: ModifierStack,
    pub cooldown: ModifierStack,
    pub speed: ModifierStack,
}

impl StatModifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_damage(mut self, modifier: ValueModifier) -> Self {
        self.damage.push(modifier);
        self
    }

    pub fn with_cost(mut self, modifier: ValueModifier) -> Self {
        self.cost.push(modifier);
        self
    }

    pub fn with_cooldown(mut self, modifier: ValueModifier) -> Self {
        self.cooldown.push(modifier);
        self
    }

    pub fn with_speed(mut self, modifier: ValueModifier) -> Self {
        self.speed.push(modifier);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.damage.is_empty()
            && self.cost.is_empty()
            && self.cooldown.is_empty()
            && self.speed.is_empty()
    }

    /// Stat-wise concatenation with `self` applied before `outer`. Cast
    /// delegation uses this so inner layers resolve before outer ones,
    /// matching the effective-stat query path.
    pub fn layered_under(&self, outer: &Self) -> Self {
        Self {
            damage: self.damage.then(&outer.damage),
            cost: self.cost.then(&outer.cost),
            cooldown: self.cooldown.then(&outer.cooldown),
            speed: self.speed.then(&outer.speed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stack_is_identity() {
        let stack = ModifierStack::new();
        assert!((stack.apply(42.5) - 42.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_multiply_then_add() {
        let stack: ModifierStack =
            [ValueModifier::multiply(2.0), ValueModifier::add(5.0)].into_iter().collect();
        assert!((stack.apply(10.0) - 25.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_add_then_multiply() {
        let stack: ModifierStack =
            [ValueModifier::add(5.0), ValueModifier::multiply(2.0)].into_iter().collect();
        assert!((stack.apply(10.0) - 30.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut stack = ModifierStack::new();
        stack.push(ValueModifier::add(1.0));
        stack.push(ValueModifier::multiply(3.0));
        stack.push(ValueModifier::add(-2.0));
        // ((0 + 1) * 3) - 2
        assert!((stack.apply(0.0) - 1.0).abs() < f32::EPSILON);
        assert_eq!(stack.len(), 3);
    }

    #[test]
    fn test_then_concatenates_in_order() {
        let inner: ModifierStack = [ValueModifier::add(5.0)].into_iter().collect();
        let outer: ModifierStack = [ValueModifier::multiply(2.0)].into_iter().collect();
        assert!((inner.then(&outer).apply(10.0) - 30.0).abs() < f32::EPSILON);
        assert!((outer.then(&inner).apply(10.0) - 25.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_default_set_passes_all_stats_through() {
        let set = StatModifierSet::default();
        assert!(set.is_empty());
        for base in [0.0, 12.0, 95.5] {
            assert!((set.damage.apply(base) - base).abs() < f32::EPSILON);
            assert!((set.cost.apply(base) - base).abs() < f32::EPSILON);
            assert!((set.cooldown.apply(base) - base).abs() < f32::EPSILON);
            assert!((set.speed.apply(base) - base).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn test_builder_targets_named_stat() {
        let set = StatModifierSet::new()
            .with_damage(ValueModifier::multiply(1.5))
            .with_cost(ValueModifier::add(10.0));
        assert_eq!(set.damage.len(), 1);
        assert_eq!(set.cost.len(), 1);
        assert!(set.cooldown.is_empty());
        assert!(set.speed.is_empty());
        assert!((set.damage.apply(10.0) - 15.0).abs() < f32::EPSILON);
        assert!((set.cost.apply(20.0) - 30.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_layered_under_applies_inner_first() {
        let inner = StatModifierSet::new().with_damage(ValueModifier::add(5.0));
        let outer = StatModifierSet::new().with_damage(ValueModifier::multiply(2.0));
        let layered = inner.layered_under(&outer);
        assert!((layered.damage.apply(10.0) - 30.0).abs() < f32::EPSILON);
    }
}
