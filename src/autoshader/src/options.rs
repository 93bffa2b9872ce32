use derivative::Derivative;

/// Knobs for what the generator emits.
#[derive(Clone, Debug, Derivative, Eq, PartialEq)]
#[derivative(Default)]
pub struct Options {
    /// Name of the vertex input struct.
    #[derivative(Default(value = "\"Vertex\".to_owned()"))]
    pub vertex_name: String,
    #[derivative(Default(value = "true"))]
    pub vertex: bool,
    /// Embed the module words as statics. When disabled, `Components`
    /// takes the code as arguments instead.
    #[derivative(Default(value = "true"))]
    pub source: bool,
    /// Nested modules to wrap the output in, outermost first.
    pub modules: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = Options::default();
        assert_eq!(options.vertex_name, "Vertex");
        assert!(options.vertex && options.source);
        assert!(options.modules.is_empty());
    }
}
