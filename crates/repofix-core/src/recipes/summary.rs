//! Replace the summary router's `groupBy(['source'])` aggregation with a
//! `findMany` + reduce over `status`.
//!
//! The Application model has no `source` column, so the original groupBy
//! blows up at runtime. The safe block keeps the same output shape the UI
//! expects (`[{ source, _count: { _all } }]`) while grouping on `status`.

use crate::locate::first_existing;
use crate::mutate::Patch;
use crate::paths::SUMMARY_ROUTER;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Marker variable introduced by the safe block; its presence means the
/// patch has already been applied.
pub const APPLIED_MARKER: &str = "appsForSources";

pub const SAFE_BLOCK: &str = r#"// "Source" counts fall back to status, since `source` is not in the model.
const appsForSources = await prisma.application.findMany({
  where: { userId },
  select: { status: true },
});

const sourceCountMap = appsForSources.reduce<Record<string, number>>(
  (acc, { status }) => {
    const key = status ?? 'UNKNOWN';
    acc[key] = (acc[key] ?? 0) + 1;
    return acc;
  },
  {}
);

// Keep the same shape the UI expects: [{ source, _count: { _all } }]
const sourceGrp = Object.entries(sourceCountMap).map(([source, count]) => ({
  source,
  _count: { _all: count },
}));"#;

/// Candidate locations for the summary router, in priority order.
pub const CANDIDATES: &[&str] = &[
    SUMMARY_ROUTER,
    "apps/api/src/trpc/routers/summary.router.ts",
    "apps/api/src/routers/summary.ts",
];

pub fn locate(root: &Path) -> Option<PathBuf> {
    first_existing(root, CANDIDATES)
}

fn group_by_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            // `[^;]*?` keeps the match from swallowing an earlier groupBy
            // call (each call ends with `;` before the next one starts).
            r"(?s)const\s+[A-Za-z0-9_$]+\s*=\s*await\s+prisma\.application\.groupBy\s*\([^;]*?by:\s*\[\s*'source'\s*\].*?\);\s*",
        )
        .unwrap()
    })
}

fn find_many_source_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?s)const\s+[A-Za-z0-9_$]+\s*=\s*await\s+prisma\.application\.findMany\s*\([^;]*?select:\s*\{\s*source:\s*true\s*\}.*?reduce.*?\);\s*",
        )
        .unwrap()
    })
}

pub struct SummarySourceCounts;

impl Patch for SummarySourceCounts {
    fn name(&self) -> &str {
        "summary-source-counts"
    }

    fn is_applied(&self, content: &str) -> bool {
        content.contains(APPLIED_MARKER)
    }

    fn apply(&self, content: &str) -> Option<String> {
        let replacement = format!("{SAFE_BLOCK}\n");

        // Preferred: replace a groupBy(['source']) block.
        if group_by_re().is_match(content) {
            return Some(
                group_by_re()
                    .replace(content, replacement.as_str())
                    .into_owned(),
            );
        }

        // Or a findMany select { source: true } … reduce(…) block.
        if find_many_source_re().is_match(content) {
            return Some(
                find_many_source_re()
                    .replace(content, replacement.as_str())
                    .into_owned(),
            );
        }

        // Last resort: inject right after the first `where: { userId }` query line.
        if let Some(idx) = content.find("where: { userId }") {
            let insert_at = content[idx..]
                .find('\n')
                .map(|off| idx + off + 1)
                .unwrap_or(content.len());
            let mut next = String::with_capacity(content.len() + SAFE_BLOCK.len() + 2);
            next.push_str(&content[..insert_at]);
            next.push('\n');
            next.push_str(SAFE_BLOCK);
            next.push('\n');
            next.push_str(&content[insert_at..]);
            return Some(next);
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutate::{apply_to_file, Outcome};
    use tempfile::TempDir;

    const GROUP_BY_ROUTER: &str = r#"export const summaryRouter = router({
  get: procedure.query(async ({ ctx }) => {
    const statusGrp = await prisma.application.groupBy({
      by: ['status'],
      where: { userId },
      _count: { _all: true },
    });

    const sourceGrp = await prisma.application.groupBy({
      by: ['source'],
      where: { userId },
      _count: { _all: true },
    });

    return { statusGrp, sourceGrp };
  }),
});
"#;

    #[test]
    fn replaces_group_by_block() {
        let patch = SummarySourceCounts;
        let next = patch.apply(GROUP_BY_ROUTER).unwrap();
        assert!(next.contains("appsForSources = await prisma.application.findMany"));
        assert!(!next.contains("by: ['source']"));
        // The status groupBy is untouched
        assert!(next.contains("by: ['status']"));
    }

    #[test]
    fn second_run_is_noop_via_marker() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("summary.ts");
        std::fs::write(&file, GROUP_BY_ROUTER).unwrap();

        let first = apply_to_file(&file, &SummarySourceCounts, false).unwrap();
        assert!(matches!(first, Outcome::Patched { .. }));
        let after_first = std::fs::read_to_string(&file).unwrap();

        let second = apply_to_file(&file, &SummarySourceCounts, false).unwrap();
        assert!(matches!(second, Outcome::AlreadyApplied));
        assert_eq!(std::fs::read_to_string(&file).unwrap(), after_first);
    }

    #[test]
    fn replaces_find_many_source_reduce() {
        let src = r#"const bySource = await prisma.application.findMany({
  where: { userId },
  select: { source: true },
}).then((rows) => rows.reduce((acc, r) => acc, {}));
const other = 1;
"#;
        let next = SummarySourceCounts.apply(src).unwrap();
        assert!(next.contains("appsForSources"));
        assert!(next.contains("const other = 1;"));
        assert!(!next.contains("select: { source: true },"));
    }

    #[test]
    fn falls_back_to_injection_after_user_id_where() {
        let src = "const apps = await prisma.application.findMany({\n  where: { userId },\n});\n";
        let next = SummarySourceCounts.apply(src).unwrap();
        assert!(next.contains("appsForSources"));
        // Original query is preserved; block injected after its where line
        assert!(next.starts_with("const apps = await prisma.application.findMany({\n  where: { userId },\n"));
    }

    #[test]
    fn unrecognized_content_is_not_patched() {
        assert!(SummarySourceCounts.apply("export const x = 1;\n").is_none());
    }

    #[test]
    fn whitespace_variations_still_match() {
        let src = "const g = await prisma.application.groupBy( {\n    by: [ 'source' ],\n    where: { userId }\n} );\n";
        let next = SummarySourceCounts.apply(src).unwrap();
        assert!(next.contains("appsForSources"));
        assert!(!next.contains("groupBy"));
    }

    #[test]
    fn locate_prefers_primary_candidate() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("apps/api/src/router")).unwrap();
        std::fs::create_dir_all(dir.path().join("apps/api/src/routers")).unwrap();
        std::fs::write(dir.path().join("apps/api/src/router/summary.ts"), "").unwrap();
        std::fs::write(dir.path().join("apps/api/src/routers/summary.ts"), "").unwrap();
        let found = locate(dir.path()).unwrap();
        assert!(found.ends_with("apps/api/src/router/summary.ts"));
    }
}
