//! Procedure catalogue: every remote operation, its wire name and its kind.

use std::fmt;

/// Whether a procedure has side effects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcedureKind {
    /// Read-only, safe to retry.
    Query,
    /// Side-effecting.
    Mutation,
}

/// Every remote procedure exposed over `/rpc`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Procedure {
    Healthcheck,
    CreateCanvas,
    GetCanvases,
    GetCanvas,
    UpdateCanvas,
    DeleteCanvas,
    CreateShape,
    GetShapes,
    UpdateShape,
    DeleteShape,
    UpdateCursor,
    GetCursors,
    RemoveCursor,
}

impl Procedure {
    pub const ALL: [Procedure; 13] = [
        Procedure::Healthcheck,
        Procedure::CreateCanvas,
        Procedure::GetCanvases,
        Procedure::GetCanvas,
        Procedure::UpdateCanvas,
        Procedure::DeleteCanvas,
        Procedure::CreateShape,
        Procedure::GetShapes,
        Procedure::UpdateShape,
        Procedure::DeleteShape,
        Procedure::UpdateCursor,
        Procedure::GetCursors,
        Procedure::RemoveCursor,
    ];

    /// Wire name used in the frame `syscall` field and the `/rpc/{name}` path.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Healthcheck => "healthcheck",
            Self::CreateCanvas => "createCanvas",
            Self::GetCanvases => "getCanvases",
            Self::GetCanvas => "getCanvas",
            Self::UpdateCanvas => "updateCanvas",
            Self::DeleteCanvas => "deleteCanvas",
            Self::CreateShape => "createShape",
            Self::GetShapes => "getShapes",
            Self::UpdateShape => "updateShape",
            Self::DeleteShape => "deleteShape",
            Self::UpdateCursor => "updateCursor",
            Self::GetCursors => "getCursors",
            Self::RemoveCursor => "removeCursor",
        }
    }

    /// Look up a procedure by its exact wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    #[must_use]
    pub fn kind(self) -> ProcedureKind {
        match self {
            Self::Healthcheck | Self::GetCanvases | Self::GetCanvas | Self::GetShapes | Self::GetCursors => {
                ProcedureKind::Query
            }
            Self::CreateCanvas
            | Self::UpdateCanvas
            | Self::DeleteCanvas
            | Self::CreateShape
            | Self::UpdateShape
            | Self::DeleteShape
            | Self::UpdateCursor
            | Self::RemoveCursor => ProcedureKind::Mutation,
        }
    }

    #[must_use]
    pub fn is_query(self) -> bool {
        self.kind() == ProcedureKind::Query
    }
}

impl fmt::Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for procedure in Procedure::ALL {
            assert_eq!(Procedure::from_name(procedure.name()), Some(procedure));
        }
    }

    #[test]
    fn from_name_is_case_sensitive() {
        assert_eq!(Procedure::from_name("createcanvas"), None);
        assert_eq!(Procedure::from_name("CreateCanvas"), None);
        assert_eq!(Procedure::from_name(""), None);
    }

    #[test]
    fn reads_are_queries() {
        let queries: Vec<_> = Procedure::ALL
            .into_iter()
            .filter(|p| p.is_query())
            .map(Procedure::name)
            .collect();
        assert_eq!(queries, ["healthcheck", "getCanvases", "getCanvas", "getShapes", "getCursors"]);
    }

    #[test]
    fn cursor_updates_are_mutations() {
        assert_eq!(Procedure::UpdateCursor.kind(), ProcedureKind::Mutation);
        assert_eq!(Procedure::RemoveCursor.kind(), ProcedureKind::Mutation);
    }
}
