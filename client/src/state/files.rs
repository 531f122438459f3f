//! File-tree replica for the shared workspace.
//!
//! SYSTEM CONTEXT
//! ==============
//! The tree is an arena: nodes keyed by [`FileId`] hold their parent id and,
//! for directories, an ordered list of child ids. Nodes only ever enter the
//! arena under an existing directory, so it cannot form a cycle.
//!
//! Local operations validate, mutate, and return the payload to broadcast.
//! Remote `apply_*` operations are idempotent: replaying an event that has
//! already been applied reports `Ok(false)` and leaves the tree untouched.
//!
//! INVARIANTS
//! ==========
//! - No two children of a directory share a name.
//! - The root exists, is a directory, and is never renamed or deleted.
//! - `open_files` holds only existing files; `active_file` is one of them.

#[cfg(test)]
#[path = "files_test.rs"]
mod files_test;

use std::collections::{HashMap, HashSet};

use frames::model::{
    DirectoryCreated, DirectoryDeleted, DirectoryRenamed, FileCreated, FileDeleted, FileId, FileRenamed,
    FileStructureSync, FileSystemItem, FileUpdated, ItemKind, ROOT_DIR_ID, ROOT_DIR_NAME, SocketId,
};

use crate::util::validation::{NameError, NameKind, validate_name};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FileTreeError {
    #[error(transparent)]
    InvalidName(#[from] NameError),
    #[error("no such file or directory: {0}")]
    NotFound(FileId),
    #[error("{0} is not a directory")]
    NotADirectory(FileId),
    #[error("{0} is not a file")]
    NotAFile(FileId),
    #[error("\"{name}\" already exists in this directory")]
    NameTaken { name: String },
    #[error("new name is the same as the current name")]
    SameName,
    #[error("the root directory cannot be renamed or deleted")]
    RootImmutable,
    #[error("duplicate node id: {0}")]
    DuplicateId(FileId),
    #[error("invalid file structure: {0}")]
    InvalidSnapshot(String),
}

// =============================================================================
// NODES
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    File { content: String },
    Directory { is_open: bool, children: Vec<FileId> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub id: FileId,
    pub name: String,
    /// `None` only for the root.
    pub parent: Option<FileId>,
    pub kind: NodeKind,
}

impl Node {
    #[must_use]
    pub fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File { .. })
    }

    #[must_use]
    pub fn is_directory(&self) -> bool {
        matches!(self.kind, NodeKind::Directory { .. })
    }

    #[must_use]
    pub fn content(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::File { content } => Some(content),
            NodeKind::Directory { .. } => None,
        }
    }

    #[must_use]
    pub fn children(&self) -> &[FileId] {
        match &self.kind {
            NodeKind::Directory { children, .. } => children,
            NodeKind::File { .. } => &[],
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self.kind, NodeKind::Directory { is_open: true, .. })
    }
}

// =============================================================================
// TREE
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileTree {
    nodes: HashMap<FileId, Node>,
    root: FileId,
    open_files: Vec<FileId>,
    active_file: Option<FileId>,
}

impl Default for FileTree {
    fn default() -> Self {
        let root = FileId::root();
        let node = Node {
            id: root.clone(),
            name: ROOT_DIR_NAME.to_owned(),
            parent: None,
            kind: NodeKind::Directory { is_open: true, children: Vec::new() },
        };
        Self { nodes: HashMap::from([(root.clone(), node)]), root, open_files: Vec::new(), active_file: None }
    }
}

impl FileTree {
    /// Build a tree from a wire snapshot rooted at the `root` directory.
    ///
    /// # Errors
    ///
    /// Returns [`FileTreeError::InvalidSnapshot`] for a non-root top node,
    /// [`FileTreeError::DuplicateId`] or [`FileTreeError::NameTaken`] when the
    /// snapshot breaks the tree invariants.
    pub fn from_item(item: &FileSystemItem) -> Result<Self, FileTreeError> {
        if item.kind != ItemKind::Directory || item.id.as_str() != ROOT_DIR_ID {
            return Err(FileTreeError::InvalidSnapshot(format!(
                "top node must be the {ROOT_DIR_ID} directory, got {}",
                item.id
            )));
        }
        let mut tree = Self { nodes: HashMap::new(), root: item.id.clone(), open_files: Vec::new(), active_file: None };
        tree.check_subtree(item, &mut HashSet::new())?;
        tree.insert_subtree(None, item);
        Ok(tree)
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn root_id(&self) -> &FileId {
        &self.root
    }

    #[must_use]
    pub fn get(&self, id: &FileId) -> Option<&Node> {
        self.nodes.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &FileId) -> bool {
        self.nodes.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the root is never removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    #[must_use]
    pub fn content(&self, id: &FileId) -> Option<&str> {
        self.nodes.get(id).and_then(Node::content)
    }

    #[must_use]
    pub fn open_files(&self) -> &[FileId] {
        &self.open_files
    }

    #[must_use]
    pub fn active_file(&self) -> Option<&FileId> {
        self.active_file.as_ref()
    }

    /// Active file node, if one is selected.
    #[must_use]
    pub fn active_node(&self) -> Option<&Node> {
        self.active_file.as_ref().and_then(|id| self.nodes.get(id))
    }

    /// Child of `parent` called `name`, compared case-sensitively.
    #[must_use]
    pub fn find_child(&self, parent: &FileId, name: &str) -> Option<&FileId> {
        let parent = self.nodes.get(parent)?;
        parent
            .children()
            .iter()
            .find(|child| self.nodes.get(*child).is_some_and(|n| n.name == name))
    }

    /// Children in display order: directories first, then files, each group
    /// by byte-wise name.
    #[must_use]
    pub fn sorted_children(&self, id: &FileId) -> Vec<&Node> {
        let Some(node) = self.nodes.get(id) else {
            return Vec::new();
        };
        let mut children: Vec<&Node> = node
            .children()
            .iter()
            .filter_map(|child| self.nodes.get(child))
            .collect();
        children.sort_by(|a, b| (a.is_file(), a.name.as_str()).cmp(&(b.is_file(), b.name.as_str())));
        children
    }

    /// Slash-joined names from the root, e.g. `root/src/a.js`.
    #[must_use]
    pub fn path_of(&self, id: &FileId) -> Option<String> {
        let mut names = Vec::new();
        let mut cursor = self.nodes.get(id)?;
        loop {
            names.push(cursor.name.as_str());
            match &cursor.parent {
                Some(parent) => cursor = self.nodes.get(parent)?,
                None => break,
            }
        }
        names.reverse();
        Some(names.join("/"))
    }

    /// Inverse of [`FileTree::path_of`]. The first segment must name the root.
    #[must_use]
    pub fn resolve_path(&self, path: &str) -> Option<FileId> {
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let root = self.nodes.get(&self.root)?;
        if segments.next()? != root.name {
            return None;
        }
        let mut current = self.root.clone();
        for segment in segments {
            current = self.find_child(&current, segment)?.clone();
        }
        Some(current)
    }

    // -------------------------------------------------------------------------
    // Local operations
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Fails on an invalid name, a missing or non-directory parent, or a
    /// sibling with the same name. The tree is unchanged on failure.
    pub fn create_file(&mut self, parent: &FileId, name: &str) -> Result<FileCreated, FileTreeError> {
        validate_name(name, NameKind::File)?;
        self.check_new_child(parent, name)?;
        let new_file = FileSystemItem::file(FileId::generate(), name, "");
        self.insert_subtree(Some(parent.clone()), &new_file);
        Ok(FileCreated { parent_dir_id: parent.clone(), new_file })
    }

    /// # Errors
    ///
    /// Same as [`FileTree::create_file`].
    pub fn create_directory(&mut self, parent: &FileId, name: &str) -> Result<DirectoryCreated, FileTreeError> {
        validate_name(name, NameKind::Directory)?;
        self.check_new_child(parent, name)?;
        let new_directory = FileSystemItem::directory(FileId::generate(), name, Vec::new());
        self.insert_subtree(Some(parent.clone()), &new_directory);
        Ok(DirectoryCreated { parent_dir_id: parent.clone(), new_directory })
    }

    /// # Errors
    ///
    /// Fails on an invalid or unchanged name, a sibling collision, the root,
    /// or an id that is not a file.
    pub fn rename_file(&mut self, id: &FileId, name: &str) -> Result<FileRenamed, FileTreeError> {
        self.check_local_rename(id, name, NameKind::File)?;
        self.rename_node(id, name);
        Ok(FileRenamed { file_id: id.clone(), new_name: name.to_owned() })
    }

    /// # Errors
    ///
    /// Same as [`FileTree::rename_file`], for directories.
    pub fn rename_directory(&mut self, id: &FileId, name: &str) -> Result<DirectoryRenamed, FileTreeError> {
        self.check_local_rename(id, name, NameKind::Directory)?;
        self.rename_node(id, name);
        Ok(DirectoryRenamed { dir_id: id.clone(), new_name: name.to_owned() })
    }

    /// # Errors
    ///
    /// Fails for the root, a missing id, or a directory id.
    pub fn delete_file(&mut self, id: &FileId) -> Result<FileDeleted, FileTreeError> {
        self.expect_kind(id, NameKind::File)?;
        self.remove_subtree(id);
        Ok(FileDeleted { file_id: id.clone() })
    }

    /// Remove a directory and everything beneath it.
    ///
    /// # Errors
    ///
    /// Fails for the root, a missing id, or a file id.
    pub fn delete_directory(&mut self, id: &FileId) -> Result<DirectoryDeleted, FileTreeError> {
        self.expect_kind(id, NameKind::Directory)?;
        self.remove_subtree(id);
        Ok(DirectoryDeleted { dir_id: id.clone() })
    }

    /// Overwrite a file's content.
    ///
    /// # Errors
    ///
    /// Fails for a missing id or a directory id.
    pub fn update_content(&mut self, id: &FileId, content: &str) -> Result<FileUpdated, FileTreeError> {
        match self.nodes.get_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::File { content: current }) => {
                content.clone_into(current);
                Ok(FileUpdated { file_id: id.clone(), new_content: content.to_owned() })
            }
            Some(NodeKind::Directory { .. }) => Err(FileTreeError::NotAFile(id.clone())),
            None => Err(FileTreeError::NotFound(id.clone())),
        }
    }

    /// Add a file to the open set and make it active. No-op for directories
    /// and unknown ids.
    pub fn open_file(&mut self, id: &FileId) -> bool {
        if !self.nodes.get(id).is_some_and(Node::is_file) {
            return false;
        }
        if !self.open_files.contains(id) {
            self.open_files.push(id.clone());
        }
        self.active_file = Some(id.clone());
        true
    }

    /// Remove a file from the open set. Closing the active file activates the
    /// most recently opened remaining file.
    pub fn close_file(&mut self, id: &FileId) -> bool {
        let Some(index) = self.open_files.iter().position(|open| open == id) else {
            return false;
        };
        self.open_files.remove(index);
        if self.active_file.as_ref() == Some(id) {
            self.active_file = self.open_files.last().cloned();
        }
        true
    }

    /// Flip `is_open` on one directory.
    pub fn toggle_directory(&mut self, id: &FileId) -> bool {
        match self.nodes.get_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Directory { is_open, .. }) => {
                *is_open = !*is_open;
                true
            }
            _ => false,
        }
    }

    pub fn collapse_directories(&mut self) {
        for node in self.nodes.values_mut() {
            if let NodeKind::Directory { is_open, .. } = &mut node.kind {
                *is_open = false;
            }
        }
    }

    // -------------------------------------------------------------------------
    // Remote application
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Fails when the parent is missing or the name collides with a sibling.
    pub fn apply_file_created(&mut self, event: &FileCreated) -> Result<bool, FileTreeError> {
        self.apply_created(&event.parent_dir_id, &event.new_file, ItemKind::File)
    }

    /// # Errors
    ///
    /// Same as [`FileTree::apply_file_created`].
    pub fn apply_directory_created(&mut self, event: &DirectoryCreated) -> Result<bool, FileTreeError> {
        self.apply_created(&event.parent_dir_id, &event.new_directory, ItemKind::Directory)
    }

    /// # Errors
    ///
    /// Fails for the root, a directory id, or a sibling collision.
    pub fn apply_file_renamed(&mut self, event: &FileRenamed) -> Result<bool, FileTreeError> {
        self.apply_renamed(&event.file_id, &event.new_name, NameKind::File)
    }

    /// # Errors
    ///
    /// Fails for the root, a file id, or a sibling collision.
    pub fn apply_directory_renamed(&mut self, event: &DirectoryRenamed) -> Result<bool, FileTreeError> {
        self.apply_renamed(&event.dir_id, &event.new_name, NameKind::Directory)
    }

    /// # Errors
    ///
    /// Fails for the root or a directory id.
    pub fn apply_file_deleted(&mut self, event: &FileDeleted) -> Result<bool, FileTreeError> {
        self.apply_deleted(&event.file_id, NameKind::File)
    }

    /// # Errors
    ///
    /// Fails for the root or a file id.
    pub fn apply_directory_deleted(&mut self, event: &DirectoryDeleted) -> Result<bool, FileTreeError> {
        self.apply_deleted(&event.dir_id, NameKind::Directory)
    }

    /// Last writer wins. Updates for files that no longer exist are dropped.
    ///
    /// # Errors
    ///
    /// Fails when the id names a directory.
    pub fn apply_file_updated(&mut self, event: &FileUpdated) -> Result<bool, FileTreeError> {
        match self.nodes.get_mut(&event.file_id).map(|n| &mut n.kind) {
            None => Ok(false),
            Some(NodeKind::Directory { .. }) => Err(FileTreeError::NotAFile(event.file_id.clone())),
            Some(NodeKind::File { content }) => {
                if *content == event.new_content {
                    return Ok(false);
                }
                content.clone_from(&event.new_content);
                Ok(true)
            }
        }
    }

    // -------------------------------------------------------------------------
    // Snapshots
    // -------------------------------------------------------------------------

    /// Recursive wire form of the whole tree, children in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> FileSystemItem {
        match self.nodes.get(&self.root) {
            Some(root) => self.item_of(root),
            None => FileSystemItem::directory(self.root.clone(), ROOT_DIR_NAME, Vec::new()),
        }
    }

    /// Snapshot addressed to the peer that just joined.
    #[must_use]
    pub fn export(&self, socket_id: SocketId) -> FileStructureSync {
        FileStructureSync {
            file_structure: self.snapshot(),
            open_files: self.open_files.clone(),
            active_file: self.active_file.clone(),
            socket_id,
        }
    }

    /// Replace the whole replica with a peer's snapshot. Open files that do
    /// not exist in the snapshot are dropped, and the active file is kept
    /// only if it survives that filter.
    ///
    /// # Errors
    ///
    /// See [`FileTree::from_item`]. The replica is unchanged on failure.
    pub fn replace_from_sync(&mut self, sync: &FileStructureSync) -> Result<(), FileTreeError> {
        let mut tree = Self::from_item(&sync.file_structure)?;
        for id in &sync.open_files {
            if tree.nodes.get(id).is_some_and(Node::is_file) && !tree.open_files.contains(id) {
                tree.open_files.push(id.clone());
            }
        }
        tree.active_file = sync
            .active_file
            .clone()
            .filter(|id| tree.open_files.contains(id));
        *self = tree;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn item_of(&self, node: &Node) -> FileSystemItem {
        match &node.kind {
            NodeKind::File { content } => FileSystemItem::file(node.id.clone(), node.name.clone(), content.clone()),
            NodeKind::Directory { is_open, children } => FileSystemItem {
                is_open: Some(*is_open),
                ..FileSystemItem::directory(
                    node.id.clone(),
                    node.name.clone(),
                    children
                        .iter()
                        .filter_map(|child| self.nodes.get(child))
                        .map(|child| self.item_of(child))
                        .collect(),
                )
            },
        }
    }

    fn check_new_child(&self, parent: &FileId, name: &str) -> Result<(), FileTreeError> {
        let node = self
            .nodes
            .get(parent)
            .ok_or_else(|| FileTreeError::NotFound(parent.clone()))?;
        if !node.is_directory() {
            return Err(FileTreeError::NotADirectory(parent.clone()));
        }
        if self.find_child(parent, name).is_some() {
            return Err(FileTreeError::NameTaken { name: name.to_owned() });
        }
        Ok(())
    }

    /// Verify `item` can be grafted: no id already present (in the arena or
    /// elsewhere in the item) and no duplicate names among any children.
    fn check_subtree(&self, item: &FileSystemItem, seen: &mut HashSet<FileId>) -> Result<(), FileTreeError> {
        if self.nodes.contains_key(&item.id) || !seen.insert(item.id.clone()) {
            return Err(FileTreeError::DuplicateId(item.id.clone()));
        }
        if item.kind == ItemKind::Directory {
            let children = item.children.as_deref().unwrap_or_default();
            let mut names = HashSet::new();
            for child in children {
                if !names.insert(child.name.as_str()) {
                    return Err(FileTreeError::NameTaken { name: child.name.clone() });
                }
                self.check_subtree(child, seen)?;
            }
        }
        Ok(())
    }

    /// Insert a checked item and its descendants under `parent`.
    fn insert_subtree(&mut self, parent: Option<FileId>, item: &FileSystemItem) {
        let kind = match item.kind {
            ItemKind::File => NodeKind::File { content: item.content.clone().unwrap_or_default() },
            ItemKind::Directory => NodeKind::Directory { is_open: item.is_open.unwrap_or(false), children: Vec::new() },
        };
        if let Some(parent_id) = &parent {
            if let Some(NodeKind::Directory { children, .. }) = self.nodes.get_mut(parent_id).map(|n| &mut n.kind) {
                children.push(item.id.clone());
            }
        }
        self.nodes.insert(item.id.clone(), Node { id: item.id.clone(), name: item.name.clone(), parent, kind });

        if item.kind == ItemKind::Directory {
            for child in item.children.as_deref().unwrap_or_default() {
                self.insert_subtree(Some(item.id.clone()), child);
            }
        }
    }

    fn expect_kind(&self, id: &FileId, kind: NameKind) -> Result<&Node, FileTreeError> {
        if *id == self.root {
            return Err(FileTreeError::RootImmutable);
        }
        let node = self
            .nodes
            .get(id)
            .ok_or_else(|| FileTreeError::NotFound(id.clone()))?;
        match (kind, node.is_file()) {
            (NameKind::File, false) => Err(FileTreeError::NotAFile(id.clone())),
            (NameKind::Directory, true) => Err(FileTreeError::NotADirectory(id.clone())),
            _ => Ok(node),
        }
    }

    fn check_local_rename(&self, id: &FileId, name: &str, kind: NameKind) -> Result<(), FileTreeError> {
        validate_name(name, kind)?;
        let node = self.expect_kind(id, kind)?;
        if node.name == name {
            return Err(FileTreeError::SameName);
        }
        self.check_sibling_free(node, name)
    }

    fn check_sibling_free(&self, node: &Node, name: &str) -> Result<(), FileTreeError> {
        let taken = node
            .parent
            .as_ref()
            .and_then(|parent| self.find_child(parent, name))
            .is_some_and(|other| *other != node.id);
        if taken {
            return Err(FileTreeError::NameTaken { name: name.to_owned() });
        }
        Ok(())
    }

    fn rename_node(&mut self, id: &FileId, name: &str) {
        if let Some(node) = self.nodes.get_mut(id) {
            name.clone_into(&mut node.name);
        }
    }

    fn remove_subtree(&mut self, id: &FileId) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        if let Some(parent_id) = node.parent.clone() {
            if let Some(NodeKind::Directory { children, .. }) = self.nodes.get_mut(&parent_id).map(|n| &mut n.kind) {
                children.retain(|child| child != id);
            }
        }

        let mut stack = vec![id.clone()];
        let mut removed = HashSet::new();
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                stack.extend(node.children().iter().cloned());
                removed.insert(next);
            }
        }

        self.open_files.retain(|open| !removed.contains(open));
        if self.active_file.as_ref().is_some_and(|active| removed.contains(active)) {
            self.active_file = None;
        }
    }

    fn apply_created(&mut self, parent: &FileId, item: &FileSystemItem, expected: ItemKind) -> Result<bool, FileTreeError> {
        if self.nodes.contains_key(&item.id) {
            return Ok(false);
        }
        if item.kind != expected {
            return Err(FileTreeError::InvalidSnapshot(format!("expected a {expected:?} item, got {:?}", item.kind)));
        }
        self.check_new_child(parent, &item.name)?;
        self.check_subtree(item, &mut HashSet::new())?;
        self.insert_subtree(Some(parent.clone()), item);
        Ok(true)
    }

    fn apply_renamed(&mut self, id: &FileId, name: &str, kind: NameKind) -> Result<bool, FileTreeError> {
        if !self.nodes.contains_key(id) {
            return Ok(false);
        }
        let node = self.expect_kind(id, kind)?;
        if node.name == name {
            return Ok(false);
        }
        self.check_sibling_free(node, name)?;
        self.rename_node(id, name);
        Ok(true)
    }

    fn apply_deleted(&mut self, id: &FileId, kind: NameKind) -> Result<bool, FileTreeError> {
        if !self.nodes.contains_key(id) && *id != self.root {
            return Ok(false);
        }
        self.expect_kind(id, kind)?;
        self.remove_subtree(id);
        Ok(true)
    }
}
