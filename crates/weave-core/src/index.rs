use crate::mixin::{ClassMixinDescriptor, FieldMixinDescriptor, MethodCodeMixinDescriptor, MethodMixinDescriptor, ScannedMixin};
use crate::scanner::MixinScanner;

/// Holds the scanned mixin descriptors, bucketed by kind.
///
/// Each bucket is a plain `Vec` in scanner-yield ("discovery") order, not a
/// map keyed by id or name — selection order (priority ascending, ties
/// broken by discovery order, see [`crate::selector`]) depends on that
/// order being preserved, so an unordered or alphabetically-ordered store
/// would silently corrupt tie-breaking.
#[derive(Default)]
pub struct MixinIndex {
    classes: Vec<ClassMixinDescriptor>,
    fields: Vec<FieldMixinDescriptor>,
    methods: Vec<MethodMixinDescriptor>,
    method_code: Vec<MethodCodeMixinDescriptor>,
}

impl MixinIndex {
    pub fn build(scanner: &dyn MixinScanner) -> Self {
        let mut index = Self::default();
        index.rebuild(scanner);
        index
    }

    /// Re-invokes the scanner and fully replaces the stored descriptors.
    /// Callers embedding the engine concurrently must serialize this
    /// against in-flight `modify_class` calls themselves; the index does
    /// not lock (see the crate-level concurrency notes).
    pub fn rebuild(&mut self, scanner: &dyn MixinScanner) {
        self.classes.clear();
        self.fields.clear();
        self.methods.clear();
        self.method_code.clear();
        for mixin in scanner.scan() {
            match mixin {
                ScannedMixin::Class(d) => self.classes.push(d),
                ScannedMixin::Field(d) => self.fields.push(d),
                ScannedMixin::Method(d) => self.methods.push(d),
                ScannedMixin::MethodCode(d) => self.method_code.push(d),
            }
        }
    }

    pub fn classes(&self) -> &[ClassMixinDescriptor] {
        &self.classes
    }

    pub fn fields(&self) -> &[FieldMixinDescriptor] {
        &self.fields
    }

    pub fn methods(&self) -> &[MethodMixinDescriptor] {
        &self.methods
    }

    pub fn method_code(&self) -> &[MethodCodeMixinDescriptor] {
        &self.method_code
    }

    pub fn len(&self) -> usize {
        self.classes.len() + self.fields.len() + self.methods.len() + self.method_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
