/// Double-buffered value: a working copy plus the last committed copy.
///
/// Training sub-games mutate `current` freely and `rollback` to the committed
/// copy when they end; the evaluation episode `commit`s after every tick.
#[derive(Debug, Clone)]
pub struct Committed<T: Clone> {
    current: T,
    stable: T,
}

impl<T: Clone> Committed<T> {
    pub fn new(value: T) -> Self {
        Self {
            stable: value.clone(),
            current: value,
        }
    }

    pub fn current(&self) -> &T {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut T {
        &mut self.current
    }

    pub fn stable(&self) -> &T {
        &self.stable
    }

    pub fn commit(&mut self) {
        self.stable.clone_from(&self.current);
    }

    pub fn rollback(&mut self) {
        self.current.clone_from(&self.stable);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rollback_restores_committed_value() {
        let mut value = Committed::new(vec![1, 2, 3]);
        value.current_mut().push(4);
        assert_eq!(value.current().len(), 4);
        assert_eq!(value.stable().len(), 3);

        value.rollback();
        assert_eq!(value.current(), &vec![1, 2, 3]);
    }

    #[test]
    fn test_commit_then_mutation_is_independent() {
        let mut value = Committed::new(vec![0u32; 2]);
        value.current_mut()[0] = 7;
        value.commit();
        value.current_mut()[1] = 9;

        assert_eq!(value.stable(), &vec![7, 0]);
        value.rollback();
        assert_eq!(value.current(), &vec![7, 0]);
    }
}
