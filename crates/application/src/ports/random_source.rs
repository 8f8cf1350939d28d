/// Randomness used for transaction IDs and server selection.
pub trait RandomSource: Send + Sync {
    fn next_id(&self) -> u16;

    /// Uniform index in `0..bound`. `bound` is never zero.
    fn next_index(&self, bound: usize) -> usize;
}
