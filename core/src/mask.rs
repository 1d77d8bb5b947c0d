/// Per-cell boolean layer over a square board, stored row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    size: usize,
    bits: Vec<bool>,
}

impl Mask {
    pub fn new(size: usize) -> Self {
        Self::filled(size, false)
    }

    pub fn filled(size: usize, value: bool) -> Self {
        Self {
            size,
            bits: vec![value; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, row: usize, col: usize) -> bool {
        self.bits[row * self.size + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: bool) {
        self.bits[row * self.size + col] = value;
    }

    /// Flips the bit and returns its new value.
    pub fn toggle(&mut self, row: usize, col: usize) -> bool {
        let bit = &mut self.bits[row * self.size + col];
        *bit = !*bit;
        *bit
    }

    pub fn fill(&mut self, value: bool) {
        self.bits.fill(value);
    }

    pub fn count(&self) -> usize {
        self.bits.iter().filter(|&&bit| bit).count()
    }

    pub fn all(&self) -> bool {
        self.bits.iter().all(|&bit| bit)
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.bits
    }
}
