//! Directory/file tree of covered sources
//!
//! Directories become JaCoCo packages and files become classes.

/// A node in the source tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    /// A directory, named relative to the tree root with a trailing `/` (the root is `""`)
    Directory { name: String, children: Vec<TreeNode> },
    /// A source file; `path` is the key of its coverage record
    File { name: String, path: String },
}

impl TreeNode {
    /// Create an empty directory node
    pub fn directory(name: &str) -> Self {
        TreeNode::Directory {
            name: name.to_string(),
            children: Vec::new(),
        }
    }

    /// Create a file node
    pub fn file(name: &str, path: &str) -> Self {
        TreeNode::File {
            name: name.to_string(),
            path: path.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TreeNode::Directory { name, .. } | TreeNode::File { name, .. } => name,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, TreeNode::Directory { .. })
    }

    pub fn children(&self) -> &[TreeNode] {
        match self {
            TreeNode::Directory { children, .. } => children,
            TreeNode::File { .. } => &[],
        }
    }

    /// Count of files in this subtree
    pub fn file_count(&self) -> usize {
        match self {
            TreeNode::File { .. } => 1,
            TreeNode::Directory { children, .. } => children.iter().map(|c| c.file_count()).sum(),
        }
    }

    /// Record paths of every file, depth-first
    pub fn file_paths(&self) -> Vec<&str> {
        let mut paths = Vec::new();
        self.collect_paths(&mut paths);
        paths
    }

    fn collect_paths<'a>(&'a self, paths: &mut Vec<&'a str>) {
        match self {
            TreeNode::File { path, .. } => paths.push(path),
            TreeNode::Directory { children, .. } => {
                for child in children {
                    child.collect_paths(paths);
                }
            }
        }
    }

    /// Insert `file` below the chain of directories named in `dirs`, creating them as needed
    fn insert(&mut self, dirs: &[String], file: TreeNode) {
        let TreeNode::Directory { children, .. } = self else {
            return;
        };
        match dirs.split_first() {
            None => children.push(file),
            Some((first, rest)) => {
                let idx = match children.iter().position(|c| c.is_directory() && c.name() == first.as_str()) {
                    Some(idx) => idx,
                    None => {
                        children.push(TreeNode::directory(first));
                        children.len() - 1
                    }
                };
                children[idx].insert(rest, file);
            }
        }
    }

    /// Sort children alphabetically (directories first, then files)
    pub fn sort_children(&mut self) {
        if let TreeNode::Directory { children, .. } = self {
            children.sort_by(|a, b| match (a.is_directory(), b.is_directory()) {
                (true, false) => std::cmp::Ordering::Less,
                (false, true) => std::cmp::Ordering::Greater,
                _ => a.name().cmp(b.name()),
            });

            for child in children.iter_mut() {
                child.sort_children();
            }
        }
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split(['/', '\\']).collect()
}

/// Build the tree for a set of record paths.
///
/// The root is the deepest directory shared by every path; files directly in it
/// belong to the unnamed package.
pub fn summarize<'a>(paths: impl IntoIterator<Item = &'a str>) -> TreeNode {
    let files: Vec<(&str, Vec<&str>)> = paths.into_iter().map(|p| (p, segments(p))).collect();

    let common = common_parent_len(&files);
    let mut root = TreeNode::directory("");

    for (path, parts) in &files {
        let Some((file_name, parents)) = parts.split_last() else {
            continue;
        };
        let relative = &parents[common..];

        let dirs: Vec<String> = (1..=relative.len())
            .map(|depth| format!("{}/", relative[..depth].join("/")))
            .collect();

        let mut name = relative.join("/");
        if !name.is_empty() {
            name.push('/');
        }
        name.push_str(file_name);

        root.insert(&dirs, TreeNode::file(&name, path));
    }

    root.sort_children();
    root
}

fn common_parent_len(files: &[(&str, Vec<&str>)]) -> usize {
    let mut parents = files
        .iter()
        .map(|(_, parts)| &parts[..parts.len().saturating_sub(1)]);

    let Some(first) = parents.next() else {
        return 0;
    };

    parents.fold(first.len(), |len, other| {
        first
            .iter()
            .zip(other.iter())
            .take(len)
            .take_while(|(a, b)| a == b)
            .count()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_root_is_stripped() {
        let root = summarize(["/repo/lib/util/b.js", "/repo/lib/util/a.js"]);

        assert_eq!(root.name(), "");
        assert_eq!(root.children().len(), 2);
        assert_eq!(root.children()[0], TreeNode::file("a.js", "/repo/lib/util/a.js"));
        assert_eq!(root.children()[1], TreeNode::file("b.js", "/repo/lib/util/b.js"));
    }

    #[test]
    fn test_nested_directories() {
        let root = summarize([
            "/repo/index.js",
            "/repo/lib/a.js",
            "/repo/lib/deep/c.js",
            "/repo/lib/b.js",
        ]);

        assert_eq!(root.file_count(), 4);
        // directories sort before files
        let lib = &root.children()[0];
        assert_eq!(lib.name(), "lib/");
        assert_eq!(root.children()[1].name(), "index.js");

        let names: Vec<&str> = lib.children().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["lib/deep/", "lib/a.js", "lib/b.js"]);

        assert_eq!(
            root.file_paths(),
            vec!["/repo/lib/deep/c.js", "/repo/lib/a.js", "/repo/lib/b.js", "/repo/index.js"]
        );
    }

    #[test]
    fn test_windows_separators() {
        let root = summarize(["C:\\src\\app\\main.js", "C:\\src\\util.js"]);
        assert_eq!(root.children()[0].name(), "app/");
        assert_eq!(root.children()[0].children()[0].name(), "app/main.js");
        assert_eq!(root.children()[1].name(), "util.js");
    }

    #[test]
    fn test_empty_input() {
        let root = summarize(std::iter::empty());
        assert!(root.is_directory());
        assert_eq!(root.file_count(), 0);
    }
}
