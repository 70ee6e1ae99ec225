//! Home screen layout: tabs per screen size and the widgets placed on them.
//!
//! # Invariants
//! - A widget's dimension is one its type allows.
//! - A widget's type is allowed on its tab's target screen.
//! - A widget fits inside the target's column count.

use crate::model::framework::entity::{
    contains_many, entity_header, owns_many, LinkDescriptor, RefResolver,
};
use crate::model::framework::{
    CrownEntity, DomainContext, Entity, EntityHeader, EntityId, EntityName, EntityStructure,
    IndexField, InputValidationError, TrunkEntity, UpdateAction, ValidationResult,
};
use crate::model::values::{HomeTabTarget, WidgetDimension, WidgetType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeConfig {
    #[serde(skip)]
    pub header: EntityHeader,
    pub workspace_ref_id: EntityId,
    pub order_of_tabs: BTreeMap<HomeTabTarget, Vec<EntityId>>,
}

impl HomeConfig {
    pub fn new(ctx: &DomainContext, workspace_ref_id: EntityId) -> Self {
        let args = ctx.frame().arg("workspace_ref_id", &workspace_ref_id).finish();
        Self {
            header: EntityHeader::new_created(ctx, "new_home_config", args),
            workspace_ref_id,
            order_of_tabs: BTreeMap::new(),
        }
    }

    pub fn add_tab(mut self, ctx: &DomainContext, target: HomeTabTarget, tab_ref_id: EntityId) -> Self {
        let args = ctx
            .frame()
            .arg("target", &target)
            .arg("tab_ref_id", &tab_ref_id)
            .finish();
        self.order_of_tabs.entry(target).or_default().push(tab_ref_id);
        self.header.record_update(ctx, "add_tab", args);
        self
    }

    pub fn remove_tab(mut self, ctx: &DomainContext, target: HomeTabTarget, tab_ref_id: EntityId) -> Self {
        let args = ctx
            .frame()
            .arg("target", &target)
            .arg("tab_ref_id", &tab_ref_id)
            .finish();
        if let Some(tabs) = self.order_of_tabs.get_mut(&target) {
            tabs.retain(|tab| *tab != tab_ref_id);
        }
        self.header.record_update(ctx, "remove_tab", args);
        self
    }

    pub fn tabs_for(&self, target: HomeTabTarget) -> &[EntityId] {
        self.order_of_tabs.get(&target).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Entity for HomeConfig {
    const KIND: &'static str = "home_config";
    const STRUCTURE: EntityStructure = EntityStructure::Trunk;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        Some(self.workspace_ref_id)
    }

    fn links() -> &'static [LinkDescriptor] {
        const LINKS: &[LinkDescriptor] = &[contains_many("home_tab")];
        LINKS
    }
}

impl TrunkEntity for HomeConfig {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeTab {
    #[serde(skip)]
    pub header: EntityHeader,
    pub home_config_ref_id: EntityId,
    pub target: HomeTabTarget,
    pub name: EntityName,
}

impl HomeTab {
    pub fn new_home_tab(
        ctx: &DomainContext,
        home_config_ref_id: EntityId,
        target: HomeTabTarget,
        name: EntityName,
    ) -> Self {
        let args = ctx.frame().arg("target", &target).arg("name", &name).finish();
        Self {
            header: EntityHeader::new_created(ctx, "new_home_tab", args),
            home_config_ref_id,
            target,
            name,
        }
    }

    pub fn update(mut self, ctx: &DomainContext, name: UpdateAction<EntityName>) -> Self {
        let args = ctx.frame().update("name", &name).finish();
        self.name = name.or_else(self.name);
        self.header.record_update(ctx, "update", args);
        self
    }
}

impl Entity for HomeTab {
    const KIND: &'static str = "home_tab";
    const STRUCTURE: EntityStructure = EntityStructure::Branch;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        Some(self.home_config_ref_id)
    }

    fn display_name(&self) -> String {
        self.name.to_string()
    }

    fn links() -> &'static [LinkDescriptor] {
        const LINKS: &[LinkDescriptor] = &[owns_many("home_widget", RefResolver::Parent)];
        LINKS
    }
}

impl CrownEntity for HomeTab {}

/// Top-left cell plus the widget's size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetGeometry {
    pub row: u32,
    pub col: u32,
    pub dimension: WidgetDimension,
}

impl WidgetGeometry {
    /// Cells covered, as `(row, col)` pairs.
    pub fn cells(&self) -> Vec<(u32, u32)> {
        let (rows, cols) = self.dimension.size();
        (self.row..self.row + rows)
            .flat_map(|row| (self.col..self.col + cols).map(move |col| (row, col)))
            .collect()
    }

    pub fn overlaps(&self, other: &WidgetGeometry) -> bool {
        let mine = self.cells();
        other.cells().iter().any(|cell| mine.contains(cell))
    }
}

pub fn check_widget_placement(
    the_type: WidgetType,
    target: HomeTabTarget,
    geometry: &WidgetGeometry,
) -> ValidationResult<()> {
    if !the_type.allowed_dimensions().contains(&geometry.dimension) {
        return Err(InputValidationError::new(format!(
            "widget {the_type} does not support dimension {}",
            geometry.dimension
        )));
    }
    if !the_type.allowed_targets().contains(&target) {
        return Err(InputValidationError::new(format!(
            "widget {the_type} is not available on {target}"
        )));
    }
    let (_, cols) = geometry.dimension.size();
    if geometry.col + cols > target.max_columns() {
        return Err(InputValidationError::new(format!(
            "widget {the_type} does not fit in the {} columns of {target}",
            target.max_columns()
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeWidget {
    #[serde(skip)]
    pub header: EntityHeader,
    pub home_tab_ref_id: EntityId,
    pub name: EntityName,
    pub the_type: WidgetType,
    pub geometry: WidgetGeometry,
}

impl HomeWidget {
    pub fn new_home_widget(
        ctx: &DomainContext,
        tab: &HomeTab,
        the_type: WidgetType,
        geometry: WidgetGeometry,
    ) -> ValidationResult<Self> {
        check_widget_placement(the_type, tab.target, &geometry)?;
        let name = EntityName::from_generated(&the_type.as_str().replace('_', " "));
        let args = ctx
            .frame()
            .arg("the_type", &the_type)
            .arg("row", &geometry.row)
            .arg("col", &geometry.col)
            .arg("dimension", &geometry.dimension)
            .finish();
        Ok(Self {
            header: EntityHeader::new_created(ctx, "new_home_widget", args),
            home_tab_ref_id: tab.ref_id(),
            name,
            the_type,
            geometry,
        })
    }

    pub fn move_and_resize(
        mut self,
        ctx: &DomainContext,
        tab: &HomeTab,
        geometry: WidgetGeometry,
    ) -> ValidationResult<Self> {
        check_widget_placement(self.the_type, tab.target, &geometry)?;
        let args = ctx
            .frame()
            .arg("row", &geometry.row)
            .arg("col", &geometry.col)
            .arg("dimension", &geometry.dimension)
            .finish();
        self.geometry = geometry;
        self.header.record_update(ctx, "move_and_resize", args);
        Ok(self)
    }
}

impl Entity for HomeWidget {
    const KIND: &'static str = "home_widget";
    const STRUCTURE: EntityStructure = EntityStructure::Leaf;

    entity_header!();

    fn parent_ref_id(&self) -> Option<EntityId> {
        Some(self.home_tab_ref_id)
    }

    fn display_name(&self) -> String {
        self.name.to_string()
    }

    fn index_fields(&self) -> Vec<IndexField> {
        vec![("the_type", self.the_type.to_string())]
    }
}

impl CrownEntity for HomeWidget {}

#[cfg(test)]
mod tests {
    use super::{check_widget_placement, WidgetGeometry};
    use crate::model::values::{HomeTabTarget, WidgetDimension, WidgetType};

    fn at(row: u32, col: u32, dimension: WidgetDimension) -> WidgetGeometry {
        WidgetGeometry { row, col, dimension }
    }

    #[test]
    fn placement_respects_type_dimensions_and_screen() {
        assert!(check_widget_placement(
            WidgetType::Motd,
            HomeTabTarget::BigScreen,
            &at(0, 0, WidgetDimension::Dim1x3)
        )
        .is_ok());
        assert!(check_widget_placement(
            WidgetType::Motd,
            HomeTabTarget::BigScreen,
            &at(0, 0, WidgetDimension::Dim3x3)
        )
        .is_err());
        assert!(check_widget_placement(
            WidgetType::TimePlanView,
            HomeTabTarget::SmallScreen,
            &at(0, 0, WidgetDimension::Dim2x1)
        )
        .is_err());
        assert!(check_widget_placement(
            WidgetType::Motd,
            HomeTabTarget::SmallScreen,
            &at(0, 0, WidgetDimension::Dim1x2)
        )
        .is_err());
    }

    #[test]
    fn overlapping_geometries_are_detected() {
        let first = at(0, 0, WidgetDimension::Dim2x2);
        assert!(first.overlaps(&at(1, 1, WidgetDimension::Dim1x1)));
        assert!(!first.overlaps(&at(0, 2, WidgetDimension::Dim1x1)));
    }
}
