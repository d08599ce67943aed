use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "genres")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(unique)]
    pub slug: String,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    TitleGenre,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::TitleGenre => Entity::has_many(super::title_genres::Entity).into(),
        }
    }
}

impl Related<super::title_genres::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TitleGenre.def()
    }
}

impl Related<super::titles::Entity> for Entity {
    fn to() -> RelationDef {
        super::title_genres::Relation::Title.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::title_genres::Relation::Genre.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
