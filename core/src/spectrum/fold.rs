use std::cmp::Ordering;

use super::{Mask, Masked, State};

impl<S: State> Masked<S> {
    /// Returns the folded spectrum.
    ///
    /// Entries with a total allele count above half the total sample size are added onto their
    /// complement and masked. The mask of the folded spectrum is the union of the existing mask,
    /// its reverse, and the folded-out entries. Folding an already folded spectrum returns a copy.
    pub fn fold(&self) -> Self {
        if self.folded {
            return self.clone();
        }

        let shape = self.spectrum.shape();
        let n = self.spectrum.elements();
        let total_count = shape.total_sample_size();

        // Entries with a total count below this are folded onto, entries above are folded out
        let mid_count = total_count / 2;

        // With an even total sample size, entries summing to exactly half are their own mirror
        // image, e.g. the anti-diagonal of a 3x3 spectrum
        let has_diagonal = total_count % 2 == 0;

        // Mirrored reads must see the unfolded values
        let src = self.spectrum.inner().as_slice();
        let mut folded = self.spectrum.clone();
        let dst = folded.values.as_mut_slice();

        for (i, rev_i) in (0..n).zip((0..n).rev()) {
            let count = shape.unravel_sum(i);

            dst[i] = match (count.cmp(&mid_count), has_diagonal) {
                (Ordering::Less, _) | (Ordering::Equal, false) => src[i] + src[rev_i],
                // The diagonal is averaged with its complement
                (Ordering::Equal, true) => 0.5 * src[i] + 0.5 * src[rev_i],
                (Ordering::Greater, _) => 0.0,
            };
        }

        let mask = self
            .mask
            .union(&self.mask.reversed())
            .union(&Mask::folded(shape.clone()));

        Self {
            spectrum: folded,
            mask,
            folded: true,
            populations: self.populations.clone(),
        }
    }
}
