/// Either an already fetched item or the id of one that still has to be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectOrId<T> {
    Object(T),
    Id(String),
}

impl<T> ObjectOrId<T> {
    pub fn object(item: T) -> Self {
        ObjectOrId::Object(item)
    }

    pub fn id(id: impl Into<String>) -> Self {
        ObjectOrId::Id(id.into())
    }
}
