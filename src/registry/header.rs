//! License header transform
//!
//! Prepends a header comment to every matching file that lacks it. Files
//! already starting with a different `/*` comment are left alone and logged.

use async_trait::async_trait;

use crate::error::{DeliveryError, Result};
use crate::registry::transform::{ParameterSpec, Transform, TransformInvocation, TransformResult};
use crate::workspace::{WorkingCopy, compile_glob, files_matching};

/// Glob used when the registration declares none
pub const DEFAULT_HEADER_GLOB: &str = "**/*.java";

/// Reads `glob` and `header` from the bound parameters
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderTransform;

impl HeaderTransform {
    /// Parameter declarations for a registration using this transform
    pub fn parameters(glob: Option<&str>, header: Option<&str>) -> Vec<(String, ParameterSpec)> {
        let glob = ParameterSpec::with_default(glob.unwrap_or(DEFAULT_HEADER_GLOB));
        let header = match header {
            Some(text) => ParameterSpec::with_default(text),
            None => ParameterSpec::required(),
        };
        vec![("glob".to_string(), glob), ("header".to_string(), header)]
    }
}

fn has_different_header(header: &str, content: &str) -> bool {
    content.starts_with("/*") && !content.starts_with(header)
}

#[async_trait]
impl Transform for HeaderTransform {
    async fn transform(&self, wc: &mut dyn WorkingCopy, invocation: &TransformInvocation<'_>) -> Result<TransformResult> {
        let header = invocation
            .parameter("header")
            .ok_or_else(|| DeliveryError::Parameter("header transform needs 'header'".to_string()))?;
        let glob = invocation.parameter("glob").unwrap_or_else(|| DEFAULT_HEADER_GLOB.to_string());
        let pattern = compile_glob(&glob, DeliveryError::Parameter)?;

        let matching = files_matching(wc, &pattern).await?;
        let mut added = 0;
        for path in &matching {
            let Some(content) = wc.read_file(path).await? else {
                continue;
            };
            if content.contains(&header) {
                continue;
            }
            if has_different_header(&header, &content) {
                log::info!("{} already has a different header", path);
                continue;
            }
            wc.write_file(path, &format!("{}\n\n{}", header, content)).await?;
            added += 1;
        }

        log::info!(
            "{} files matched [{}]. {} headers added. {} files skipped",
            matching.len(),
            glob,
            added,
            matching.len() - added
        );

        Ok(if added > 0 {
            TransformResult::edited()
        } else {
            TransformResult::unchanged()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Credentials, InvocationContext, Push, RepoRef};
    use crate::registry::transform::Parameters;
    use crate::workspace::InMemoryWorkingCopy;
    use serde_json::json;

    const HEADER: &str = "/*\n * Copyright Acme\n */";

    async fn run(wc: &mut InMemoryWorkingCopy, params: Parameters) -> Result<TransformResult> {
        let push = Push::new("acme", "widget", "main", "head");
        let ctx = InvocationContext::new("T1", Credentials::token(""));
        let inv = TransformInvocation::new(&push, &ctx, &params);
        HeaderTransform.transform(wc, &inv).await
    }

    fn params(glob: &str) -> Parameters {
        Parameters::from([("glob".to_string(), json!(glob)), ("header".to_string(), json!(HEADER))])
    }

    #[tokio::test]
    async fn test_adds_missing_header() {
        let mut wc = InMemoryWorkingCopy::new(
            RepoRef::new("acme", "widget", "head"),
            &[("src/A.java", "class A {}"), ("README.md", "# hi")],
        );
        let result = run(&mut wc, params("**/*.java")).await.unwrap();
        assert!(result.edited);
        assert_eq!(wc.content("src/A.java").unwrap(), format!("{}\n\nclass A {{}}", HEADER));
        assert_eq!(wc.content("README.md").as_deref(), Some("# hi"));
    }

    #[tokio::test]
    async fn test_skips_files_with_header_or_different_header() {
        let existing = format!("{}\n\nclass A {{}}", HEADER);
        let mut wc = InMemoryWorkingCopy::new(
            RepoRef::new("acme", "widget", "head"),
            &[("src/A.java", &existing), ("src/B.java", "/* GPL */\nclass B {}")],
        );
        let result = run(&mut wc, params("**/*.java")).await.unwrap();
        assert!(!result.edited);
        assert!(wc.git_status().await.unwrap().is_clean);
    }

    #[tokio::test]
    async fn test_missing_header_parameter() {
        let mut wc = InMemoryWorkingCopy::new(RepoRef::new("acme", "widget", "head"), &[]);
        let err = run(&mut wc, Parameters::new()).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Parameter(_)));
    }

    #[test]
    fn test_parameters_declare_defaults() {
        let declared = HeaderTransform::parameters(None, None);
        assert_eq!(declared[0].1.default, Some(json!(DEFAULT_HEADER_GLOB)));
        assert!(declared[1].1.required);
    }
}
