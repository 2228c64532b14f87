// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Provar

use std::any::Any;

use provar_engine::{AutoshrinkConfig, Generated, Generator, Runner};

use crate::SPECIAL_GATE_BITS;

/// Generator for `bool`; a zero stream yields `false`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Bool;

impl Generator for Bool {
	fn generate(&self, t: &mut Runner) -> Generated {
		Generated::Value(Box::new(t.random_bits(1) != 0))
	}

	fn format(&self, instance: &dyn Any) -> Option<String> {
		instance.downcast_ref::<bool>().map(|v| v.to_string())
	}

	fn autoshrink(&self) -> Option<AutoshrinkConfig> {
		Some(AutoshrinkConfig::default())
	}
}

fn draws_special(t: &mut Runner) -> bool {
	t.random_bits(SPECIAL_GATE_BITS) == (1 << SPECIAL_GATE_BITS) - 1
}

macro_rules! unsigned_generator {
	($(#[$doc:meta])* $name:ident, $ty:ty, [$($special:expr),+ $(,)?]) => {
		$(#[$doc])*
		#[derive(Clone, Copy, Debug, Default)]
		pub struct $name {
			limit: Option<$ty>,
		}

		impl $name {
			pub fn new() -> Self {
				Self { limit: None }
			}

			/// Generate values in `[0, limit)`.
			pub fn with_limit(limit: $ty) -> Self {
				assert!(limit > 0);
				Self { limit: Some(limit) }
			}
		}

		impl Generator for $name {
			fn generate(&self, t: &mut Runner) -> Generated {
				const SPECIAL: &[$ty] = &[$($special),+];
				let mut value = if draws_special(t) {
					SPECIAL[t.random_bits(8) as usize % SPECIAL.len()]
				} else {
					t.random_bits(<$ty>::BITS as u8) as $ty
				};
				if let Some(limit) = self.limit {
					value %= limit;
				}
				Generated::Value(Box::new(value))
			}

			fn format(&self, instance: &dyn Any) -> Option<String> {
				instance.downcast_ref::<$ty>().map(|v| v.to_string())
			}

			fn autoshrink(&self) -> Option<AutoshrinkConfig> {
				Some(AutoshrinkConfig::default())
			}
		}
	};
}

macro_rules! signed_generator {
	($(#[$doc:meta])* $name:ident, $ty:ty, $unsigned:ty, [$($special:expr),+ $(,)?]) => {
		$(#[$doc])*
		#[derive(Clone, Copy, Debug, Default)]
		pub struct $name {
			limit: Option<$ty>,
		}

		impl $name {
			pub fn new() -> Self {
				Self { limit: None }
			}

			/// Generate values in `[-limit, limit)`.
			pub fn with_limit(limit: $ty) -> Self {
				assert!(limit > 0);
				Self { limit: Some(limit) }
			}
		}

		impl Generator for $name {
			fn generate(&self, t: &mut Runner) -> Generated {
				const SPECIAL: &[$ty] = &[$($special),+];
				let mut value = if draws_special(t) {
					SPECIAL[t.random_bits(8) as usize % SPECIAL.len()]
				} else {
					t.random_bits(<$ty>::BITS as u8) as $unsigned as $ty
				};
				if let Some(limit) = self.limit {
					if value < -limit {
						value %= -limit;
					} else if value >= limit {
						value %= limit;
					}
				}
				Generated::Value(Box::new(value))
			}

			fn format(&self, instance: &dyn Any) -> Option<String> {
				instance.downcast_ref::<$ty>().map(|v| v.to_string())
			}

			fn autoshrink(&self) -> Option<AutoshrinkConfig> {
				Some(AutoshrinkConfig::default())
			}
		}
	};
}

macro_rules! float_generator {
	($(#[$doc:meta])* $name:ident, $ty:ty, $bits:expr, [$($special:expr),+ $(,)?]) => {
		$(#[$doc])*
		#[derive(Clone, Copy, Debug, Default)]
		pub struct $name {
			limit: Option<$ty>,
		}

		impl $name {
			pub fn new() -> Self {
				Self { limit: None }
			}

			/// Generate values in `[-limit, limit)`.
			pub fn with_limit(limit: $ty) -> Self {
				assert!(limit > 0.0);
				Self { limit: Some(limit) }
			}
		}

		impl Generator for $name {
			fn generate(&self, t: &mut Runner) -> Generated {
				const SPECIAL: &[$ty] = &[$($special),+];
				let mut value = if draws_special(t) {
					SPECIAL[t.random_bits(8) as usize % SPECIAL.len()]
				} else {
					t.random_bits($bits) as $ty
				};
				if let Some(limit) = self.limit {
					if value < -limit {
						value %= -limit;
					} else {
						value %= limit;
					}
				}
				Generated::Value(Box::new(value))
			}

			fn format(&self, instance: &dyn Any) -> Option<String> {
				instance
					.downcast_ref::<$ty>()
					.map(|v| format!("{v} (0x{:0width$x})", v.to_bits(), width = $bits / 4))
			}

			fn autoshrink(&self) -> Option<AutoshrinkConfig> {
				Some(AutoshrinkConfig::default())
			}
		}
	};
}

unsigned_generator!(
	/// Generator for `u8`.
	Uint8, u8,
	[0, 1, 2, 3, 4, 5, 6, 7, 63, 64, 65, 127, 128, 129, 254, 255]
);

unsigned_generator!(
	/// Generator for `u16`.
	Uint16, u16,
	[0, 1, 2, 3, 4, 5, 6, 255, 256, 1024, 4096, 16384, 32768, 32769, 65534, 65535]
);

unsigned_generator!(
	/// Generator for `u32`.
	Uint32, u32,
	[
		0, 1, 2, 3, 4, 5, 6, 255,
		1 << 8, (1 << 8) + 1, (1 << 16) - 1, 1 << 16, (1 << 16) + 1,
		1 << 19, 1 << 22, u32::MAX,
	]
);

unsigned_generator!(
	/// Generator for `u64`.
	Uint64, u64,
	[
		0, 1, 2, 3, 4, 5, 6, 255,
		1 << 8, 1 << 16, 1 << 32, (1 << 32) + 1, 1 << 53, (1 << 53) + 1,
		u64::MAX - 1, u64::MAX,
	]
);

unsigned_generator!(
	/// Generator for `usize`.
	Usize, usize,
	[0, 1, 2, 3, 4, 5, 6, 255, 256, usize::MAX - 1, usize::MAX]
);

signed_generator!(
	/// Generator for `i8`.
	Int8, i8, u8,
	[0, 1, 2, 3, -1, -2, -3, -4, 63, 64, 65, 127, -128, -127, -2, -1]
);

signed_generator!(
	/// Generator for `i16`.
	Int16, i16, u16,
	[0, 1, 2, 3, 4, 5, 6, 255, 256, 1024, 4096, 16384, i16::MIN, i16::MIN + 1, -2, -1]
);

signed_generator!(
	/// Generator for `i32`.
	Int32, i32, u32,
	[
		0, 1, 2, 3, 4, 5, 6, 255,
		1 << 8, (1 << 8) + 1, (1 << 16) - 1, 1 << 16, (1 << 16) + 1,
		1 << 19, 1 << 22, -1,
	]
);

signed_generator!(
	/// Generator for `i64`.
	Int64, i64, u64,
	[
		0, 1, 2, 3, 4, 5, 6, 255,
		1 << 8, 1 << 16, 1 << 32, (1 << 32) + 1, 1 << 53, (1 << 53) + 1,
		-2, -1,
	]
);

float_generator!(
	/// Generator for `f32`.
	Float32, f32, 32,
	[
		0.0, 1.0, -1.0, f32::NAN, f32::INFINITY, f32::NEG_INFINITY,
		f32::MIN_POSITIVE, f32::MAX,
	]
);

float_generator!(
	/// Generator for `f64`.
	Float64, f64, 64,
	[
		0.0, 1.0, -1.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY,
		f64::MIN_POSITIVE, f64::MAX,
	]
);
