use std::f32::consts::TAU;

/// Oscillator shape. `phase` is an angle in `[0, TAU)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform {
    pub const ALL: [Waveform; 4] = [
        Waveform::Sine,
        Waveform::Square,
        Waveform::Sawtooth,
        Waveform::Triangle,
    ];

    pub fn sample(self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => sine(phase),
            Waveform::Square => square(phase),
            Waveform::Sawtooth => sawtooth(phase),
            Waveform::Triangle => triangle(phase),
        }
    }

    pub fn index(self) -> u8 {
        match self {
            Waveform::Sine => 0,
            Waveform::Square => 1,
            Waveform::Sawtooth => 2,
            Waveform::Triangle => 3,
        }
    }

    /// Dropdown index; anything unknown is a sine.
    pub fn from_index(index: u8) -> Self {
        match index {
            1 => Waveform::Square,
            2 => Waveform::Sawtooth,
            3 => Waveform::Triangle,
            _ => Waveform::Sine,
        }
    }

    /// Dropdown option text, case-insensitive; anything unknown is a sine.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "square" => Waveform::Square,
            "sawtooth" => Waveform::Sawtooth,
            "triangle" => Waveform::Triangle,
            _ => Waveform::Sine,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Sawtooth => "sawtooth",
            Waveform::Triangle => "triangle",
        }
    }
}

pub fn sine(phase: f32) -> f32 {
    phase.sin()
}

/// Sign of the sine; exactly zero where the sine is zero.
pub fn square(phase: f32) -> f32 {
    let s = phase.sin();
    if s > 0.0 {
        1.0
    } else if s < 0.0 {
        -1.0
    } else {
        0.0
    }
}

pub fn sawtooth(phase: f32) -> f32 {
    2.0 * (phase / TAU) - 1.0
}

/// Ping-pong fold of `2 * phase / TAU` over `[0, 1]`, scaled to `[-1, 1]`.
pub fn triangle(phase: f32) -> f32 {
    let t = 2.0 * phase / TAU;
    let folded = 1.0 - ((t.rem_euclid(2.0)) - 1.0).abs();
    folded * 2.0 - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phases() -> impl Iterator<Item = f32> {
        (0..1000).map(|i| i as f32 / 1000.0 * TAU)
    }

    #[test]
    fn test_all_shapes_stay_in_range() {
        for phase in phases() {
            for wave in Waveform::ALL {
                let s = wave.sample(phase);
                assert!((-1.0..=1.0).contains(&s), "{:?} at {} gave {}", wave, phase, s);
            }
            assert!([-1.0, 0.0, 1.0].contains(&square(phase)));
        }
    }

    #[test]
    fn test_known_points() {
        assert_eq!(square(0.0), 0.0);
        assert_eq!(square(TAU / 4.0), 1.0);
        assert_eq!(square(3.0 * TAU / 4.0), -1.0);
        assert_eq!(sawtooth(0.0), -1.0);
        assert!((sawtooth(TAU / 2.0)).abs() < 1e-6);
        assert_eq!(triangle(0.0), -1.0);
        assert!((triangle(TAU / 4.0) - 0.0).abs() < 1e-6);
        assert!((triangle(TAU / 2.0) - 1.0).abs() < 1e-6);
        assert!((triangle(3.0 * TAU / 4.0)).abs() < 1e-6);
    }

    #[test]
    fn test_triangle_is_continuous() {
        let mut prev = triangle(0.0);
        for phase in phases().skip(1) {
            let s = triangle(phase);
            assert!((s - prev).abs() < 0.01, "jump at {}", phase);
            prev = s;
        }
    }

    #[test]
    fn test_unknown_selectors_fall_back_to_sine() {
        assert_eq!(Waveform::from_index(42), Waveform::Sine);
        assert_eq!(Waveform::from_name("wobble"), Waveform::Sine);
        assert_eq!(Waveform::from_name("Square"), Waveform::Square);
        for wave in Waveform::ALL {
            assert_eq!(Waveform::from_index(wave.index()), wave);
            assert_eq!(Waveform::from_name(wave.name()), wave);
        }
    }
}
