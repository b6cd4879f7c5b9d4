//! Framebuffer configuration selection.
//!
//! The display server offers every framebuffer configuration matching the
//! mandatory attributes (true-color, double-buffered, 8-bit RGBA, 24-bit depth,
//! 8-bit stencil). Among those, one is picked by its multisample count:
//!
//! 1. Candidates without a visual are skipped.
//! 2. A candidate is *eligible* when it has multisampling enabled and no more
//!    samples than the requested target.
//! 3. The eligible candidate with the most samples wins. On equal counts the
//!    first one scanned wins.
//! 4. When nothing is eligible, the first scanned candidate is used.

use tracing::{debug, info};

/// What the selector needs to know about one offered configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FbCandidate {
    /// The configuration can produce a visual for a window
    pub has_visual: bool,
    /// Number of multisample buffers (0 means multisampling is off)
    pub sample_buffers: i32,
    /// Samples per pixel
    pub samples: i32,
}

impl FbCandidate {
    /// Whether multisampling is enabled for this configuration.
    #[inline]
    pub fn is_multisampled(&self) -> bool {
        self.sample_buffers > 0
    }

    /// Sample count if this candidate may be picked for `target_msaa`.
    fn eligible_samples(&self, target_msaa: u32) -> Option<i32> {
        let within_target = u32::try_from(self.samples).is_ok_and(|s| s <= target_msaa);
        (self.has_visual && self.is_multisampled() && within_target).then_some(self.samples)
    }
}

/// The configuration that was chosen, as reported to the application.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FbConfigInfo {
    /// Position in the list offered by the display server
    pub index: usize,
    pub sample_buffers: i32,
    pub samples: i32,
}

/// Picks a configuration index from `candidates` for `target_msaa`.
///
/// Returns `None` if no candidate has a visual.
pub fn select_fb_config(candidates: &[FbCandidate], target_msaa: u32) -> Option<FbConfigInfo> {
    let mut fallback: Option<usize> = None;
    let mut best: Option<(usize, i32)> = None;

    for (index, candidate) in candidates.iter().enumerate() {
        if !candidate.has_visual {
            debug!("Framebuffer config {} skipped: no visual", index);
            continue;
        }
        fallback.get_or_insert(index);

        debug!(
            "Framebuffer config {}: sample buffers {}, samples {}",
            index, candidate.sample_buffers, candidate.samples
        );

        if let Some(samples) = candidate.eligible_samples(target_msaa) {
            // Strictly greater: the first config with a given count wins.
            if best.is_none_or(|(_, best_samples)| samples > best_samples) {
                best = Some((index, samples));
            }
        }
    }

    let index = best.map(|(index, _)| index).or(fallback)?;
    let chosen = &candidates[index];
    let offered = candidates.len();
    let samples = if chosen.is_multisampled() {
        chosen.samples
    } else {
        0
    };

    info!(
        "Selected framebuffer config {} of {} ({} samples, target {})",
        index, offered, samples, target_msaa
    );

    Some(FbConfigInfo {
        index,
        sample_buffers: chosen.sample_buffers,
        samples: chosen.samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> FbCandidate {
        FbCandidate {
            has_visual: true,
            sample_buffers: 0,
            samples: 0,
        }
    }

    fn msaa(samples: i32) -> FbCandidate {
        FbCandidate {
            has_visual: true,
            sample_buffers: 1,
            samples,
        }
    }

    #[test]
    fn test_empty_list() {
        assert_eq!(select_fb_config(&[], 4), None);
    }

    #[test]
    fn test_no_visuals() {
        let candidates = [FbCandidate::default(), FbCandidate::default()];
        assert_eq!(select_fb_config(&candidates, 4), None);
    }

    #[test]
    fn test_highest_samples_within_target() {
        let candidates = [plain(), msaa(2), msaa(8), msaa(4), msaa(16)];
        let chosen = select_fb_config(&candidates, 4).unwrap();
        assert_eq!(chosen.index, 3);
        assert_eq!(chosen.samples, 4);
    }

    #[test]
    fn test_closest_below_target() {
        let candidates = [plain(), msaa(2), msaa(8)];
        let chosen = select_fb_config(&candidates, 6).unwrap();
        assert_eq!(chosen.index, 1);
    }

    #[test]
    fn test_first_encountered_wins_ties() {
        let candidates = [plain(), msaa(4), msaa(2), msaa(4), msaa(4)];
        assert_eq!(select_fb_config(&candidates, 4).unwrap().index, 1);
    }

    #[test]
    fn test_first_candidate_is_default() {
        let candidates = [plain(), msaa(8), msaa(16)];
        let chosen = select_fb_config(&candidates, 4).unwrap();
        assert_eq!(chosen.index, 0);
        assert_eq!(chosen.sample_buffers, 0);
    }

    #[test]
    fn test_zero_target_keeps_default() {
        let candidates = [plain(), msaa(2), msaa(4)];
        assert_eq!(select_fb_config(&candidates, 0).unwrap().index, 0);
    }

    #[test]
    fn test_multisampled_first_over_target_is_replaced() {
        // An over-target default must not block a later eligible candidate.
        let candidates = [msaa(8), plain(), msaa(4)];
        assert_eq!(select_fb_config(&candidates, 4).unwrap().index, 2);
    }

    #[test]
    fn test_non_multisampled_samples_are_ignored() {
        let candidates = [
            plain(),
            FbCandidate {
                has_visual: true,
                sample_buffers: 0,
                samples: 4,
            },
            msaa(2),
        ];
        assert_eq!(select_fb_config(&candidates, 4).unwrap().index, 2);
    }

    #[test]
    fn test_candidates_without_visual_are_skipped() {
        let candidates = [
            FbCandidate {
                has_visual: false,
                sample_buffers: 1,
                samples: 4,
            },
            plain(),
            FbCandidate {
                has_visual: false,
                sample_buffers: 1,
                samples: 2,
            },
        ];
        let chosen = select_fb_config(&candidates, 4).unwrap();
        assert_eq!(chosen.index, 1);
    }

    #[test]
    fn test_matches_reference_maximum() {
        let counts = [0, 2, 4, 8, 2, 16, 4, 6];
        let candidates: Vec<_> = counts
            .iter()
            .map(|&s| if s == 0 { plain() } else { msaa(s) })
            .collect();

        for target in 0..=16u32 {
            let expected = counts
                .iter()
                .enumerate()
                .filter(|&(_, &s)| s > 0 && s as u32 <= target)
                .fold(None, |best: Option<(usize, i32)>, (i, &s)| match best {
                    Some((_, b)) if b >= s => best,
                    _ => Some((i, s)),
                })
                .map_or(0, |(i, _)| i);

            assert_eq!(
                select_fb_config(&candidates, target).unwrap().index,
                expected,
                "target {}",
                target
            );
        }
    }
}
