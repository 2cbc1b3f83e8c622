//! Core traits for sketch implementations

use super::error::SketchError;

/// Core trait that all sketches must implement
///
/// This trait defines the fundamental operations that any data sketch must
/// support: updating with new data, estimating results, checking emptiness,
/// and serialization.
pub trait Sketch {
    /// The type of items this sketch can process
    ///
    /// May be unsized so that sketches can consume raw byte slices.
    type Item: ?Sized;

    /// Update the sketch with a new item
    ///
    /// # Arguments
    /// * `item` - The item to add to the sketch
    fn update(&mut self, item: &Self::Item);

    /// Get the estimated result from the sketch
    ///
    /// Takes `&mut self`: estimation may fold buffered updates into the
    /// register state and caches the computed value.
    ///
    /// # Returns
    /// The estimated value as a float
    fn estimate(&mut self) -> f64;

    /// Check if the sketch is empty (no items added)
    ///
    /// # Returns
    /// `true` if the sketch has not processed any items
    fn is_empty(&self) -> bool;

    /// Serialize the sketch to bytes
    ///
    /// # Returns
    /// A byte vector containing the serialized sketch
    fn serialize(&self) -> Vec<u8>;

    /// Deserialize a sketch from bytes
    ///
    /// # Arguments
    /// * `bytes` - The byte slice containing serialized sketch data
    ///
    /// # Errors
    /// Returns `SketchError::DeserializationError` if bytes are invalid
    fn deserialize(bytes: &[u8]) -> Result<Self, SketchError>
    where
        Self: Sized;
}

/// Trait for sketches that support merging
///
/// Merging is essential for distributed scenarios where sketches are
/// computed independently and then combined into a union.
pub trait Mergeable: Sketch {
    /// Merge another sketch into this one
    ///
    /// After merging, this sketch represents the union of both sketches.
    ///
    /// # Errors
    /// Returns `SketchError::IncompatibleSketches` if the sketches have
    /// different configurations (e.g., different precision)
    fn merge(&mut self, other: &Self) -> Result<(), SketchError>;
}
