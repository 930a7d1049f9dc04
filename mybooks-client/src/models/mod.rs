pub mod admin;
pub mod catalog;
pub mod order;
pub mod page;
pub mod user;

pub use admin::{
    Activity, DashboardStats, EmailSettings, GeneralSettings, NewActivity, NewsletterPreferences,
    Settings, ShippingSettings, SubscriptionStatus,
};
pub use catalog::{
    Author, AuthorId, AuthorInput, Book, BookId, BookInput, Category, CategoryId, CategoryInput,
    Comment, Editor, EditorId, EditorInput, NewComment, Series, StockLevel,
};
pub use order::{
    NewOrder, Order, OrderId, OrderLine, OrderLineRequest, OrderQuery, OrderStats, OrderStatus,
    PromoCode, ShippingAddress, UserStats,
};
pub use page::{Page, PageRequest};
pub use user::{
    Availability, Credentials, LoginResponse, NewUser, PasswordChange, PasswordReset,
    ProfileUpdate, RegisterRequest, RegisterResponse, Registration, Role, User, UserId, UserQuery,
    UserStatus, UserUpdate,
};
