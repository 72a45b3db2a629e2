//! Frame-stepped fade and slide transitions
//!
//! Every transition is a value that produces its successor; nothing here
//! keeps time. The frame loop calls `step` once per tick.

/// Upper bound of fade progress (fully opaque)
pub const MAX_OPACITY: u32 = 255;

/// Result of advancing a transition by one increment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step<T> {
    pub value: T,
    pub done: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeDirection {
    In,
    Out,
}

/// Advance fade progress by `speed` toward the end of `direction`, clamped
pub fn fade_step(progress: u32, speed: u32, direction: FadeDirection, bound: u32) -> Step<u32> {
    let value = match direction {
        FadeDirection::In => progress.saturating_add(speed).min(bound),
        FadeDirection::Out => progress.min(bound).saturating_sub(speed),
    };
    let done = match direction {
        FadeDirection::In => value == bound,
        FadeDirection::Out => value == 0,
    };
    Step { value, done }
}

/// Advance a slide offset (negative, off-screen left) toward 0, clamped
pub fn slide_step(offset: f32, increment: f32) -> Step<f32> {
    let value = (offset + increment).min(0.0);
    Step {
        value,
        done: value >= 0.0,
    }
}

/// Opacity fade between 0 and a bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fade {
    direction: FadeDirection,
    progress: u32,
    speed: u32,
    bound: u32,
}

impl Fade {
    pub fn new(direction: FadeDirection, speed: u32) -> Self {
        Self::with_bound(direction, speed, MAX_OPACITY)
    }

    pub fn with_bound(direction: FadeDirection, speed: u32, bound: u32) -> Self {
        let progress = match direction {
            FadeDirection::In => 0,
            FadeDirection::Out => bound,
        };
        Self {
            direction,
            progress,
            speed: speed.max(1),
            bound,
        }
    }

    pub fn fade_in(speed: u32) -> Self {
        Self::new(FadeDirection::In, speed)
    }

    pub fn fade_out(speed: u32) -> Self {
        Self::new(FadeDirection::Out, speed)
    }

    pub fn direction(&self) -> FadeDirection {
        self.direction
    }

    pub fn progress(&self) -> u32 {
        self.progress
    }

    pub fn bound(&self) -> u32 {
        self.bound
    }

    pub fn is_complete(&self) -> bool {
        match self.direction {
            FadeDirection::In => self.progress == self.bound,
            FadeDirection::Out => self.progress == 0,
        }
    }

    /// The fade after one more increment, and whether it has finished
    pub fn step(self) -> (Self, bool) {
        let Step { value, done } = fade_step(self.progress, self.speed, self.direction, self.bound);
        (Self { progress: value, ..self }, done)
    }

    /// Current opacity scaled to 0..=255
    pub fn opacity(&self) -> u8 {
        if self.bound == 0 {
            return 255;
        }
        ((self.progress as u64 * 255) / self.bound as u64) as u8
    }

    /// Progress values observed by the caller, one per step, ending at the bound
    pub fn sequence(self) -> impl Iterator<Item = u32> {
        let mut fade = self;
        let mut finished = fade.is_complete();
        std::iter::from_fn(move || {
            if finished {
                return None;
            }
            let (next, done) = fade.step();
            fade = next;
            finished = done;
            Some(fade.progress)
        })
    }
}

/// Horizontal arrival from the left edge, offset running from -width to 0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slide {
    offset: f32,
    increment: f32,
    width: f32,
}

impl Slide {
    pub fn new(viewport_w: f32, increment: f32) -> Self {
        let width = viewport_w.max(0.0);
        Self {
            offset: -width,
            increment: increment.max(1.0),
            width,
        }
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn is_complete(&self) -> bool {
        self.offset >= 0.0
    }

    pub fn step(self) -> (Self, bool) {
        let Step { value, done } = slide_step(self.offset, self.increment);
        (Self { offset: value, ..self }, done)
    }

    pub fn sequence(self) -> impl Iterator<Item = f32> {
        let mut slide = self;
        let mut finished = slide.is_complete();
        std::iter::from_fn(move || {
            if finished {
                return None;
            }
            let (next, done) = slide.step();
            slide = next;
            finished = done;
            Some(slide.offset)
        })
    }

    /// Completed share of the slide, 0.0..=1.0
    pub fn fraction(&self) -> f32 {
        if self.width <= 0.0 {
            return 1.0;
        }
        (1.0 + self.offset / self.width).clamp(0.0, 1.0)
    }
}

/// The active effect, as the view state machine drives it
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    Fade(Fade),
    Slide(Slide),
}

impl Transition {
    /// Advance one frame; returns true once the transition has finished
    pub fn advance(&mut self) -> bool {
        match self {
            Transition::Fade(fade) => {
                let (next, done) = fade.step();
                *fade = next;
                done
            }
            Transition::Slide(slide) => {
                let (next, done) = slide.step();
                *slide = next;
                done
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        match self {
            Transition::Fade(fade) => fade.is_complete(),
            Transition::Slide(slide) => slide.is_complete(),
        }
    }

    /// Opacity to draw with; slides are always fully opaque
    pub fn opacity(&self) -> u8 {
        match self {
            Transition::Fade(fade) => fade.opacity(),
            Transition::Slide(_) => 255,
        }
    }

    /// Horizontal draw offset; fades never move
    pub fn offset_x(&self) -> f32 {
        match self {
            Transition::Fade(_) => 0.0,
            Transition::Slide(slide) => slide.offset(),
        }
    }

    /// Normalized progress, 0.0..=1.0, in the direction of the effect
    pub fn fraction(&self) -> f32 {
        match self {
            Transition::Fade(fade) => {
                let raw = fade.progress() as f32 / fade.bound().max(1) as f32;
                match fade.direction() {
                    FadeDirection::In => raw,
                    FadeDirection::Out => 1.0 - raw,
                }
            }
            Transition::Slide(slide) => slide.fraction(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fade_in_sequence_exact() {
        for speed in [1u32, 7, 20, 64, 100, 254, 255, 256, 1000] {
            let seq: Vec<u32> = Fade::fade_in(speed).sequence().collect();
            assert_eq!(seq.len() as u32, MAX_OPACITY.div_ceil(speed), "speed {}", speed);
            assert_eq!(*seq.last().unwrap(), MAX_OPACITY);
            assert!(seq.windows(2).all(|w| w[0] < w[1]));
            assert!(seq.iter().all(|&v| v <= MAX_OPACITY));
        }
    }

    #[test]
    fn test_fade_out_sequence_exact() {
        for speed in [1u32, 20, 255, 300] {
            let seq: Vec<u32> = Fade::fade_out(speed).sequence().collect();
            assert_eq!(seq.len() as u32, MAX_OPACITY.div_ceil(speed));
            assert_eq!(*seq.last().unwrap(), 0);
            assert!(seq.windows(2).all(|w| w[0] > w[1]));
        }
    }

    #[test]
    fn test_oversized_increment_is_single_terminal_step() {
        let step = fade_step(0, 10_000, FadeDirection::In, 255);
        assert_eq!(step, Step { value: 255, done: true });

        let step = slide_step(-50.0, 500.0);
        assert_eq!(step, Step { value: 0.0, done: true });
    }

    #[test]
    fn test_default_speed_fade_length() {
        // ceil(255 / 20) = 13
        assert_eq!(Fade::fade_in(20).sequence().count(), 13);
    }

    #[test]
    fn test_slide_sequence_reaches_zero() {
        for (width, inc) in [(1280.0, 64.0), (1000.0, 30.0), (10.0, 100.0), (799.0, 7.0)] {
            let seq: Vec<f32> = Slide::new(width, inc).sequence().collect();
            assert_eq!(*seq.last().unwrap(), 0.0);
            assert!(seq.iter().all(|&v| v <= 0.0));
            assert!(seq.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_slide_steps_by_increment() {
        let offsets: Vec<f32> = Slide::new(1280.0, 20.0).sequence().take(3).collect();
        assert_eq!(offsets, vec![-1260.0, -1240.0, -1220.0]);
        // ceil(1280 / 20) = 64
        assert_eq!(Slide::new(1280.0, 20.0).sequence().count(), 64);
    }

    #[test]
    fn test_transition_wrapper() {
        let mut t = Transition::Fade(Fade::fade_in(128));
        assert_eq!(t.opacity(), 0);
        assert!(!t.advance());
        assert!(t.advance());
        assert_eq!(t.opacity(), 255);
        assert!(t.is_complete());
        assert_eq!(t.fraction(), 1.0);

        let mut s = Transition::Slide(Slide::new(100.0, 60.0));
        assert_eq!(s.offset_x(), -100.0);
        assert!(!s.advance());
        assert!(s.advance());
        assert_eq!(s.offset_x(), 0.0);
        assert_eq!(s.opacity(), 255);
    }
}
