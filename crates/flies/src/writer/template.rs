//! User defined output through a `minijinja` template.

use async_trait::async_trait;
use minijinja::Environment;

use crate::protocol::{CapturedRequest, WriteError};
use crate::writer::view::TemplateView;
use crate::writer::{Output, RequestWriter};

const TEMPLATE_NAME: &str = "request";

/// Renders each request through a template and writes the result verbatim.
///
/// The template sees `method`, `target`, `path`, `query`, `proto`, `headers` (a map from name
/// to the list of its values) and `body`:
///
/// ```text
/// {{ method }} {{ path }} {{ headers["Content-Length"][0] }}
/// ```
#[derive(Debug)]
pub struct TemplateWriter {
    output: Output,
    env: Environment<'static>,
}

impl TemplateWriter {
    /// Compiles `source`; a syntax error is returned here rather than on the first request.
    pub fn new<S: Into<String>>(output: Output, source: S) -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        // output is written verbatim, final newline included
        env.set_keep_trailing_newline(true);
        env.add_template_owned(TEMPLATE_NAME, source.into())?;
        Ok(Self { output, env })
    }
}

#[async_trait]
impl RequestWriter for TemplateWriter {
    async fn render(&self, request: &mut CapturedRequest) -> Result<(), WriteError> {
        let body = request.body_bytes().await.map_err(WriteError::body)?;
        let rendered = self.env.get_template(TEMPLATE_NAME)?.render(TemplateView::new(request.head(), &body))?;

        self.output.write_all(rendered.as_bytes()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::testing::{MemorySink, sample_request};
    use indoc::indoc;

    #[tokio::test]
    async fn exposes_request_fields() {
        let sink = MemorySink::new();
        let source = indoc! {r#"
            {{ method }} {{ path }} {{ proto }}
            query={{ query }}
            {% for value in headers["Foo"] %}foo={{ value }}
            {% endfor %}len={{ headers["Content-Length"][0] }} body={{ body }}
        "#};
        let writer = TemplateWriter::new(Output::new(sink.clone()), source).unwrap();
        writer.render(&mut sample_request()).await.unwrap();

        assert_eq!(
            sink.contents(),
            indoc! {"
                POST /my/test/path HTTP/1.1
                query=param1=value1&param2&multi=firstvalue&multi=secondvalue
                foo=Bar
                foo=two
                len=19 body=this is a test body
            "}
        );
    }

    #[tokio::test]
    async fn target_is_the_full_request_target() {
        let sink = MemorySink::new();
        let writer = TemplateWriter::new(Output::new(sink.clone()), "{{ target }}").unwrap();
        writer.render(&mut sample_request()).await.unwrap();
        assert_eq!(sink.contents(), "/my/test/path?param1=value1&param2&multi=firstvalue&multi=secondvalue");
    }

    #[tokio::test]
    async fn trailing_newline_is_kept() {
        let sink = MemorySink::new();
        let writer = TemplateWriter::new(Output::new(sink.clone()), "{{ method }}\n").unwrap();
        writer.render(&mut sample_request()).await.unwrap();
        writer.render(&mut sample_request()).await.unwrap();
        assert_eq!(sink.contents(), "POST\nPOST\n");
    }

    #[test]
    fn syntax_error_fails_construction() {
        let sink = MemorySink::new();
        assert!(TemplateWriter::new(Output::new(sink), "{% for x in %}").is_err());
    }

    #[tokio::test]
    async fn runtime_error_is_per_request() {
        let sink = MemorySink::new();
        // attribute access on an undefined value only fails while rendering
        let writer = TemplateWriter::new(Output::new(sink.clone()), "{{ missing.field }}").unwrap();
        let err = writer.render(&mut sample_request()).await.unwrap_err();
        assert!(matches!(err, WriteError::Template { .. }));
        assert_eq!(sink.contents(), "");
    }
}
